//! keytrans - translate an X11 key code into UTF-8 text
//!
//! Looks up one key press through the X input method (or an xkb keymap)
//! and prints the result.

use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info};

use keytrans::input::keycodes;
use keytrans::{Backend, Config, KeyTranslator, LookupStatus, ModifierMask};

/// Print help
fn print_help() {
    println!(
        r#"keytrans {} - translate an X11 key code into UTF-8 text

USAGE:
    keytrans [OPTIONS] <KEYCODE> [MODIFIERS]

ARGS:
    <KEYCODE>      X key code (decimal or 0x hex), e.g. 38 for 'a' on US layouts
    [MODIFIERS]    Modifier names joined by '+', e.g. shift+ctrl

OPTIONS:
    -b, --backend <NAME>    Lookup backend: xim (default) or xkb
    -d, --display <NAME>    X display to connect to (default: $DISPLAY)
    -l, --layout <LAYOUT>   XKB layout for the xkb backend
    -m, --mask <N>          Raw modifier mask (decimal or 0x hex), or'ed with MODIFIERS
    -r, --repeat <N>        Perform N identical lookups and check they agree
    -e, --evdev             Treat KEYCODE as an evdev code (adds 8)
        --print-config      Print the effective configuration and exit
    -h, --help              Print this help message
    -V, --version           Print version information

OUTPUT:
    composed "<text>" [keysym=0x....]   key produced text
    keysym 0x....                       key has a keysym but no text
    none                                nothing bound to the key
    overflow (needs N bytes)            text does not fit the 32-byte buffer

EXIT STATUS:
    0 text or keysym, 1 none or overflow, 2 error

CONFIG:
    $KEYTRANS_CONFIG, ~/.config/keytrans/config.toml, /etc/keytrans/config.toml"#,
        env!("CARGO_PKG_VERSION")
    );
}

/// Parsed command line
#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    keycode: Option<u32>,
    mask: ModifierMask,
    backend: Option<String>,
    display: Option<String>,
    layout: Option<String>,
    repeat: usize,
    evdev: bool,
    print_config: bool,
}

/// Parse decimal or 0x-prefixed hex
fn parse_number(s: &str) -> Result<u32> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.with_context(|| format!("Invalid number: {}", s))
}

impl CliArgs {
    fn parse(args: &[String]) -> Result<Self> {
        let mut cli = CliArgs {
            repeat: 1,
            ..Default::default()
        };
        let mut positional = Vec::new();
        let mut iter = args.iter();

        while let Some(arg) = iter.next() {
            let arg = arg.as_str();
            let mut value = |name: &str| {
                iter.next()
                    .cloned()
                    .ok_or_else(|| anyhow!("{} requires a value", name))
            };
            match arg {
                "-b" | "--backend" => cli.backend = Some(value(arg)?),
                "-d" | "--display" => cli.display = Some(value(arg)?),
                "-l" | "--layout" => cli.layout = Some(value(arg)?),
                "-m" | "--mask" => {
                    cli.mask |= ModifierMask::from_raw(parse_number(&value(arg)?)?);
                }
                "-r" | "--repeat" => {
                    cli.repeat = parse_number(&value(arg)?)? as usize;
                    if cli.repeat == 0 {
                        bail!("--repeat must be at least 1");
                    }
                }
                "-e" | "--evdev" => cli.evdev = true,
                "--print-config" => cli.print_config = true,
                other if other.starts_with('-') && other.len() > 1 => {
                    bail!("Unknown option: {}", other);
                }
                other => positional.push(other.to_string()),
            }
        }

        let mut positional = positional.into_iter();
        if let Some(code) = positional.next() {
            let number = parse_number(&code)?;
            let keycode = if cli.evdev {
                keycodes::from_evdev(number)
                    .ok_or_else(|| anyhow!("Evdev code {} has no X key code", code))?
            } else {
                number
            };
            cli.keycode = Some(keycode);
        }
        if let Some(mods) = positional.next() {
            cli.mask |= ModifierMask::parse(&mods)?;
        }
        if let Some(extra) = positional.next() {
            bail!("Unexpected argument: {}", extra);
        }

        Ok(cli)
    }

    /// Overlay command line settings on the loaded config
    fn apply(&self, config: &mut Config) {
        if let Some(backend) = &self.backend {
            config.lookup.backend = backend.clone();
        }
        if let Some(display) = &self.display {
            config.display.name = display.clone();
        }
        if let Some(layout) = &self.layout {
            config.keyboard.xkb_layout = layout.clone();
        }
    }
}

/// One-line description of a lookup result
fn describe(status: &LookupStatus) -> String {
    match status {
        LookupStatus::Composed {
            text,
            keysym: Some(sym),
        } => format!("composed {:?} keysym={:#06x}", text.as_str(), sym),
        LookupStatus::Composed { text, keysym: None } => format!("composed {:?}", text.as_str()),
        LookupStatus::KeySymOnly { keysym } => format!("keysym {:#06x}", keysym),
        LookupStatus::None => "none".to_string(),
        LookupStatus::Error { required } => format!("overflow (needs {} bytes)", required),
    }
}

/// Exit status for a lookup result
fn exit_code(status: &LookupStatus) -> i32 {
    match status {
        LookupStatus::Composed { .. } | LookupStatus::KeySymOnly { .. } => 0,
        LookupStatus::None | LookupStatus::Error { .. } => 1,
    }
}

fn run(args: &[String]) -> Result<i32> {
    // --help
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(0);
    }

    // --version
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("keytrans {}", env!("CARGO_PKG_VERSION"));
        return Ok(0);
    }

    let cli = CliArgs::parse(args)?;
    let mut config = Config::load();
    cli.apply(&mut config);

    if cli.print_config {
        print!("{}", config.to_toml()?);
        return Ok(0);
    }

    let keycode = cli
        .keycode
        .ok_or_else(|| anyhow!("Missing KEYCODE (see --help)"))?;
    if !keycodes::is_valid(keycode) {
        bail!(
            "Key code {} outside the X range {}..={}",
            keycode,
            keycodes::MIN_KEYCODE,
            keycodes::MAX_KEYCODE
        );
    }

    let backend = Backend::from_config(&config).context("Failed to initialize lookup backend")?;
    info!("Backend: {:?}, keycode {}, modifiers {}", backend.kind(), keycode, cli.mask);

    let first = backend.translate(keycode, cli.mask)?;
    for call in 2..=cli.repeat {
        let next = backend.translate(keycode, cli.mask)?;
        if next != first {
            bail!(
                "Lookup {} differs: {} (first was {})",
                call,
                describe(&next),
                describe(&first)
            );
        }
    }
    debug!("{} lookups agreed", cli.repeat);

    println!("{}", describe(&first));
    Ok(exit_code(&first))
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let code = match run(&args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("keytrans: {:#}", e);
            2
        }
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use smol_str::SmolStr;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_keycode_and_mods() {
        let cli = CliArgs::parse(&args(&["38", "shift+ctrl"])).unwrap();
        assert_eq!(cli.keycode, Some(38));
        assert_eq!(cli.mask, ModifierMask::SHIFT | ModifierMask::CONTROL);
        assert_eq!(cli.repeat, 1);
    }

    #[test]
    fn test_parse_options() {
        let cli = CliArgs::parse(&args(&[
            "--backend", "xkb", "-l", "de", "-m", "0x2001", "-r", "5", "0x26",
        ]))
        .unwrap();
        assert_eq!(cli.backend.as_deref(), Some("xkb"));
        assert_eq!(cli.layout.as_deref(), Some("de"));
        assert_eq!(cli.mask.group(), 1);
        assert!(cli.mask.contains(ModifierMask::SHIFT));
        assert_eq!(cli.repeat, 5);
        assert_eq!(cli.keycode, Some(38));
    }

    #[test]
    fn test_parse_evdev() {
        let cli = CliArgs::parse(&args(&["--evdev", "30"])).unwrap();
        assert_eq!(cli.keycode, Some(38));
    }

    #[test]
    fn test_parse_errors() {
        assert!(CliArgs::parse(&args(&["--display"])).is_err());
        assert!(CliArgs::parse(&args(&["--bogus"])).is_err());
        assert!(CliArgs::parse(&args(&["38", "hyper"])).is_err());
        assert!(CliArgs::parse(&args(&["38", "shift", "extra"])).is_err());
        assert!(CliArgs::parse(&args(&["-r", "0", "38"])).is_err());
        assert!(CliArgs::parse(&args(&["zz"])).is_err());
        assert!(CliArgs::parse(&args(&["--evdev", "0xffffffff"])).is_err());
    }

    #[test]
    fn test_apply_overrides() {
        let cli = CliArgs::parse(&args(&["-b", "xkb", "-d", ":2", "38"])).unwrap();
        let mut config = Config::default();
        cli.apply(&mut config);
        assert_eq!(config.lookup.backend, "xkb");
        assert_eq!(config.display.name, ":2");
        assert!(config.keyboard.xkb_layout.is_empty());
    }

    #[test]
    fn test_describe() {
        let composed = LookupStatus::Composed {
            text: SmolStr::new("a"),
            keysym: Some(0x61),
        };
        assert_eq!(describe(&composed), "composed \"a\" keysym=0x0061");
        assert_eq!(exit_code(&composed), 0);

        let sym = LookupStatus::KeySymOnly { keysym: 0xffe1 };
        assert_eq!(describe(&sym), "keysym 0xffe1");
        assert_eq!(exit_code(&sym), 0);

        assert_eq!(describe(&LookupStatus::None), "none");
        assert_eq!(exit_code(&LookupStatus::None), 1);
        assert_eq!(
            describe(&LookupStatus::Error { required: 40 }),
            "overflow (needs 40 bytes)"
        );
    }
}
