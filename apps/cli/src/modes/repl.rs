//! REPL 模式（交互式 Shell）
//!
//! 专用输入线程 + crossbeam 通道：输入线程持有 rustyline 编辑器（保留历史），
//! 主线程处理命令并在空闲时报告结束的序列。

use crate::commands::config::CliConfig;
use crate::commands::run::{load_program, parse_movement};
use crate::session::BenchSession;
use anyhow::{Context, Result};
use bench_client::{JogKey, Movement, SequenceOutcome, SequenceParams};
use bench_protocol::Axis;
use crossbeam_channel::{Receiver, RecvTimeoutError, bounded};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::path::Path;
use std::thread;
use std::time::Duration;

/// 输入线程发出的中断标记
const INTERRUPT: &str = "\u{3}";

/// Shell 命令
#[derive(Debug, Clone, PartialEq)]
pub enum ShellCommand {
    Connect(Option<String>),
    Disconnect,
    Status,
    Jog { key: JogKey, hold: Duration },
    Speed { axis: Axis, value: f64 },
    Run(SequenceParams),
    RunProgram(String),
    Save {
        path: String,
        name: String,
        params: SequenceParams,
    },
    Test(SequenceParams),
    Pause,
    Resume,
    Stop,
    ResetMetrics,
    Help,
    Exit,
}

/// 解析一行输入
///
/// `run <movement> <amplitude> <turns> <repetitions>`，运动方向可以用 `up-to-down` 写法；
/// `run --program <file>` 从 TOML 文件加载；`save <file> <name> <movement> ...` 以当前滑块保存程序。
pub fn parse_command(line: &str) -> Result<Option<ShellCommand>> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = parts.split_first() else {
        return Ok(None);
    };

    let command = match head {
        "connect" => ShellCommand::Connect(args.first().map(|s| s.to_string())),
        "disconnect" => ShellCommand::Disconnect,
        "status" => ShellCommand::Status,
        "jog" => {
            let key: JogKey = args
                .first()
                .ok_or_else(|| anyhow::anyhow!("Usage: jog <w|s|a|d|e|q> [hold-ms]"))?
                .parse()?;
            let hold_ms = match args.get(1) {
                Some(ms) => ms.parse().context("Invalid hold time")?,
                None => 300,
            };
            ShellCommand::Jog {
                key,
                hold: Duration::from_millis(hold_ms),
            }
        },
        "speed" => {
            let [axis, value] = args else {
                anyhow::bail!("Usage: speed <axis> <value>");
            };
            ShellCommand::Speed {
                axis: axis.parse()?,
                value: value.parse().context("Invalid slider value")?,
            }
        },
        "run" if args.first() == Some(&"--program") => {
            let path = args.get(1).ok_or_else(|| anyhow::anyhow!("Usage: run --program <file>"))?;
            ShellCommand::RunProgram(path.to_string())
        },
        "run" => ShellCommand::Run(parse_params(args, true)?),
        "save" => {
            let [path, name, rest @ ..] = args else {
                anyhow::bail!("Usage: save <file> <name> <movement> <mm> <turns> <reps>");
            };
            ShellCommand::Save {
                path: path.to_string(),
                name: name.to_string(),
                params: parse_params(rest, true)?,
            }
        },
        "test" => ShellCommand::Test(parse_params(args, false)?),
        "pause" => ShellCommand::Pause,
        "resume" => ShellCommand::Resume,
        "stop" => ShellCommand::Stop,
        "reset-metrics" => ShellCommand::ResetMetrics,
        "help" => ShellCommand::Help,
        "exit" | "quit" => ShellCommand::Exit,
        other => anyhow::bail!("Unknown command: {other}"),
    };
    Ok(Some(command))
}

fn parse_params(args: &[&str], with_repetitions: bool) -> Result<SequenceParams> {
    let movement: Movement = parse_movement(
        args.first()
            .ok_or(bench_client::ClientError::MissingMovement)?,
    )?;
    let number = |index: usize, name: &str| -> Result<Option<&str>> {
        match args.get(index) {
            Some(value) => Ok(Some(*value)),
            None if index == 1 => anyhow::bail!("Missing {name}"),
            None => Ok(None),
        }
    };

    let amplitude_mm = number(1, "amplitude")?
        .map(|v| v.parse::<u16>().context("Invalid amplitude"))
        .transpose()?
        .unwrap_or_default();
    let turns = number(2, "turns")?
        .map(|v| v.parse::<f64>().context("Invalid turn count"))
        .transpose()?
        .unwrap_or_default();
    let repetitions = if with_repetitions {
        number(3, "repetitions")?
            .map(|v| v.parse::<u32>().context("Invalid repetition count"))
            .transpose()?
            .unwrap_or(1)
    } else {
        1
    };

    Ok(SequenceParams {
        movement,
        amplitude_mm,
        turns,
        repetitions,
    })
}

/// REPL 输入（专用输入线程）
pub struct ReplInput {
    command_rx: Receiver<String>,
    _input_thread: thread::JoinHandle<Result<()>>,
}

impl ReplInput {
    /// 创建专用输入线程（保留历史记录）
    pub fn new() -> Self {
        let (command_tx, command_rx) = bounded::<String>(10);

        let input_thread = thread::spawn(move || {
            let mut rl = DefaultEditor::new()
                .map_err(|e| anyhow::anyhow!("Failed to initialize readline: {}", e))?;

            let history_path = ".bench_history";
            rl.load_history(history_path).ok();

            println!("Bench CLI v{} - interactive shell", env!("CARGO_PKG_VERSION"));
            println!("Type 'help' for commands, 'exit' to quit");
            println!();

            loop {
                match rl.readline("bench> ") {
                    Ok(line) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        let _ = rl.add_history_entry(line.as_str());

                        let exit = line == "exit" || line == "quit";
                        if command_tx.send(line).is_err() || exit {
                            break;
                        }
                    },
                    Err(ReadlineError::Interrupted) => {
                        println!("^C");
                        let _ = command_tx.send(INTERRUPT.to_string());
                    },
                    Err(ReadlineError::Eof) => {
                        let _ = command_tx.send("exit".to_string());
                        break;
                    },
                    Err(err) => {
                        eprintln!("Error: {:?}", err);
                        break;
                    },
                }
            }

            rl.save_history(history_path).ok();
            Ok(())
        });

        Self {
            command_rx,
            _input_thread: input_thread,
        }
    }

    fn recv_timeout(&self, timeout: Duration) -> Result<String, RecvTimeoutError> {
        self.command_rx.recv_timeout(timeout)
    }
}

/// 运行 REPL 模式
pub fn run_repl() -> Result<()> {
    let session = BenchSession::new(CliConfig::load()?);
    let input = ReplInput::new();

    loop {
        let line = match input.recv_timeout(Duration::from_millis(200)) {
            Ok(line) => line,
            Err(RecvTimeoutError::Timeout) => {
                report_outcome(&session);
                continue;
            },
            Err(RecvTimeoutError::Disconnected) => break,
        };

        if line == INTERRUPT {
            // Ctrl+C：停止正在运行的序列
            session.supervisor().stop();
            continue;
        }

        match parse_command(&line) {
            Ok(Some(ShellCommand::Exit)) => break,
            Ok(Some(command)) => {
                if let Err(err) = execute(&session, command) {
                    eprintln!("Error: {err:#}");
                }
            },
            Ok(None) => {},
            Err(err) => {
                eprintln!("Error: {err:#}");
                eprintln!("Type 'help' to list commands");
            },
        }
    }

    session.disconnect();
    println!("Bye");
    Ok(())
}

fn report_outcome(session: &BenchSession) {
    match session.supervisor().try_outcome() {
        Some(SequenceOutcome::Completed { repetitions }) => {
            println!("Sequence completed ({repetitions} repetitions)");
        },
        Some(SequenceOutcome::Stopped { repetitions }) => {
            println!("Sequence stopped after {repetitions} repetitions");
        },
        Some(SequenceOutcome::Rejected { reason }) => eprintln!("Sequence rejected: {reason}"),
        None => {},
    }
}

fn execute(session: &BenchSession, command: ShellCommand) -> Result<()> {
    match command {
        ShellCommand::Connect(port) => {
            session.connect(port.as_deref())?;
            println!("Connected");
        },
        ShellCommand::Disconnect => {
            if !session.disconnect() {
                println!("Not connected");
            }
        },
        ShellCommand::Status => println!("{}", session.status()),
        ShellCommand::Jog { key, hold } => session.jog(key, hold),
        ShellCommand::Speed { axis, value } => session.set_speed(axis, value)?,
        ShellCommand::Run(params) => session.start_program(params)?,
        ShellCommand::RunProgram(path) => {
            let program = load_program(Path::new(&path))?;
            session.apply_program_speeds(&program)?;
            session.start_program(program.to_params())?;
        },
        ShellCommand::Save { path, name, params } => {
            let program = session.save_program(Path::new(&path), &name, params)?;
            println!("Saved program {:?} to {path}", program.name);
        },
        ShellCommand::Test(params) => session.start_test(params)?,
        ShellCommand::Pause => session.supervisor().pause(),
        ShellCommand::Resume => session.supervisor().resume(),
        ShellCommand::Stop => session.supervisor().stop(),
        ShellCommand::ResetMetrics => {
            if !session.reset_metrics() {
                println!("Not connected");
            }
        },
        ShellCommand::Help => print_help(),
        ShellCommand::Exit => {},
    }
    Ok(())
}

fn print_help() {
    println!("Commands:");
    println!("  connect [port]                        connect (default port from config)");
    println!("  disconnect                            close the serial link");
    println!("  status                                link, device and sequence status");
    println!("  jog <w|s|a|d|e|q> [hold-ms]           jog one axis, then release");
    println!("  speed <axis> <value>                  move a speed slider");
    println!("  run <movement> <mm> <turns> <reps>    start a full program");
    println!("  run --program <file.toml>             start a saved program");
    println!("  save <file> <name> <movement> <mm> <turns> <reps>");
    println!("                                        save a program with the current speeds");
    println!("  test <movement> <mm> <turns>          single back-and-forth pass");
    println!("  pause | resume | stop                 control the running sequence");
    println!("  reset-metrics                         zero the link counters");
    println!("  help                                  show this help");
    println!("  exit / quit                           leave the shell");
    println!();
    println!("Movements: up-to-down, down-to-up, left-to-right, right-to-left,");
    println!("           screw-up-to-screw-down, screw-down-to-screw-up");
    println!("Ctrl+C stops the running sequence, Ctrl+D exits.");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let command = parse_command("run up-to-down 50 0 3").unwrap().unwrap();
        assert_eq!(
            command,
            ShellCommand::Run(SequenceParams {
                movement: Movement::UpToDown,
                amplitude_mm: 50,
                turns: 0.0,
                repetitions: 3,
            })
        );
    }

    #[test]
    fn test_parse_test_ignores_repetitions() {
        let Some(ShellCommand::Test(params)) = parse_command("test screw-up-to-screw-down 0 2.5").unwrap()
        else {
            panic!("expected test command");
        };
        assert_eq!(params.turns, 2.5);
        assert_eq!(params.repetitions, 1);
    }

    #[test]
    fn test_parse_jog_and_speed() {
        assert_eq!(
            parse_command("jog a 150").unwrap(),
            Some(ShellCommand::Jog {
                key: JogKey::Left,
                hold: Duration::from_millis(150)
            })
        );
        assert_eq!(
            parse_command("speed adaptor 12").unwrap(),
            Some(ShellCommand::Speed {
                axis: Axis::Adaptor,
                value: 12.0
            })
        );
        assert!(parse_command("jog x").is_err());
        assert!(parse_command("speed vertical").is_err());
    }

    #[test]
    fn test_parse_save() {
        assert_eq!(
            parse_command("save fatigue.toml fatigue-01 down-to-up 120 0 25").unwrap(),
            Some(ShellCommand::Save {
                path: "fatigue.toml".into(),
                name: "fatigue-01".into(),
                params: SequenceParams {
                    movement: Movement::DownToUp,
                    amplitude_mm: 120,
                    turns: 0.0,
                    repetitions: 25,
                },
            })
        );
        assert!(parse_command("save fatigue.toml").is_err());
        assert!(parse_command("save fatigue.toml fatigue-01").is_err());
        assert_eq!(parse_command("reset-metrics").unwrap(), Some(ShellCommand::ResetMetrics));
    }

    #[test]
    fn test_parse_misc() {
        assert_eq!(parse_command("   ").unwrap(), None);
        assert_eq!(parse_command("quit").unwrap(), Some(ShellCommand::Exit));
        assert_eq!(
            parse_command("connect /dev/ttyACM0").unwrap(),
            Some(ShellCommand::Connect(Some("/dev/ttyACM0".into())))
        );
        assert_eq!(
            parse_command("run --program fatigue.toml").unwrap(),
            Some(ShellCommand::RunProgram("fatigue.toml".into()))
        );
        assert!(parse_command("run").is_err());
        assert!(parse_command("run up-to-down").is_err());
        assert!(parse_command("dance").is_err());
    }
}
