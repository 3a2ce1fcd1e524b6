use anyhow::{bail, Context, Result};
use log::info;
use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use piface_digital::{PiFaceDigital, PinItem, SpiConfig};

fn main() -> Result<()> {
    init_logger();

    let mut config_path: Option<String> = None;
    let mut rest: Vec<String> = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--config" || arg == "-c" {
            config_path = Some(
                args.next()
                    .context("--config requires a file path argument")?,
            );
        } else {
            rest.push(arg);
        }
    }

    let config = load_config(config_path.as_deref())?;

    let command = rest.first().map(String::as_str).unwrap_or("help");
    match command {
        "init" => {
            let pfd = PiFaceDigital::init(&config)?;
            info!("board configuration written");
            pfd.deinit();
        }
        "status" => {
            let board = parse_num(rest.get(1), 0)?;
            let pfd = PiFaceDigital::open(&config)?;
            println!("board {}", board);
            println!("  outputs: 0b{:08b}", pfd.read_output(board)?);
            println!("  inputs:  0b{:08b}", pfd.read_input(board)?);
            println!("  pullups: 0b{:08b}", pfd.read_pullup(board)?);
        }
        "set" => {
            let pin = rest
                .get(1)
                .context("usage: set <pin> <0|1> [board]")?
                .parse::<u8>()
                .context("pin must be a number")?;
            let value = match rest.get(2).map(String::as_str) {
                Some("0") => false,
                Some("1") => true,
                _ => bail!("usage: set <pin> <0|1> [board]"),
            };
            let board = parse_num(rest.get(3), 0)?;
            let pfd = PiFaceDigital::open(&config)?;
            pfd.digital_write(pin, value, board)?;
            info!("pin {} on board {} set to {}", pin, board, value as u8);
        }
        "blink" => {
            let led_num = parse_num(rest.get(1), 0)?;
            let board = parse_num(rest.get(2), 0)?;
            let pfd = PiFaceDigital::init(&config)?;
            let board_items = pfd.board(board)?;
            let led = board_items
                .leds
                .get(led_num as usize)
                .context("no such LED")?;

            info!("blinking LED {} on board {}, Ctrl+C to stop", led_num, board);
            let running = running_flag()?;
            while running.load(Ordering::SeqCst) {
                led.toggle()?;
                thread::sleep(Duration::from_millis(500));
            }
            led.turn_off()?;
        }
        "watch" => {
            let board = parse_num(rest.get(1), 0)?;
            let pfd = PiFaceDigital::init(&config)?;
            let board_items = pfd.board(board)?;

            info!("watching switches on board {}, Ctrl+C to stop", board);
            let running = running_flag()?;
            let mut last = [false; 4];
            while running.load(Ordering::SeqCst) {
                for (i, switch) in board_items.switches.iter().enumerate() {
                    let pressed = switch.value()?;
                    if pressed != last[i] {
                        println!("switch {}: {}", i, if pressed { "pressed" } else { "released" });
                        last[i] = pressed;
                    }
                }
                thread::sleep(Duration::from_millis(50));
            }
        }
        "help" | "--help" | "-h" => usage(),
        other => {
            usage();
            bail!("unknown command: {}", other);
        }
    }

    Ok(())
}

fn usage() {
    println!("piface-digital [-c config.yaml] <command>");
    println!();
    println!("commands:");
    println!("  init             run the board bring-up sequence");
    println!("  status [board]   print output, input and pull-up port bytes");
    println!("  set <pin> <0|1> [board]");
    println!("                   drive a single output pin");
    println!("  blink [led] [board]");
    println!("                   toggle an LED until interrupted");
    println!("  watch [board]    report switch presses until interrupted");
}

fn load_config(path: Option<&str>) -> Result<SpiConfig> {
    match path {
        Some(path) => {
            info!("loading configuration from: {}", path);
            let content = fs::read_to_string(path)
                .context(format!("failed to read config file: {}", path))?;
            serde_yaml::from_str(&content).context("failed to parse configuration file")
        }
        None => Ok(SpiConfig::default()),
    }
}

fn parse_num(arg: Option<&String>, default: u8) -> Result<u8> {
    match arg {
        Some(arg) => arg
            .parse::<u8>()
            .context(format!("not a number: {}", arg)),
        None => Ok(default),
    }
}

fn running_flag() -> Result<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let handler_flag = Arc::clone(&running);
    ctrlc::set_handler(move || {
        handler_flag.store(false, Ordering::SeqCst);
    })
    .context("failed to set Ctrl+C handler")?;
    Ok(running)
}

fn init_logger() {
    // Use `env_logger` for logging. Systemd/journald will capture stdout/stderr.
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();
}
