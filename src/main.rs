use anyhow::Result;
use clap::Parser;
use std::io::Read;

use s2ts::bridge::SystemCommandExecutor;
use s2ts::cli::{Cli, Commands};
use s2ts::config::{Config, default_config_path};
use s2ts::engine::extract_reply;
use s2ts::engine::stabilize::CancelToken;
use s2ts::monitor::ResourceMonitor;
use s2ts::pipeline::progress::{LogSink, secfmt};
use s2ts::pipeline::{Pipeline, PipelineJob, StageSet};
use s2ts::tts::CommandSynthesizer;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(default_config_path);

    match cli.command {
        Commands::Run {
            audio,
            text,
            engine,
            langs,
            no_asr,
            no_clean,
            no_translate,
            no_tts,
            ref_audio,
            ref_text,
            timeout,
        } => {
            let mut config = Config::load_or_default(&config_path)?.with_env_overrides();
            if let Some(secs) = timeout {
                config.timing.response_timeout_secs = secs;
            }

            let synthesizer = CommandSynthesizer::new(
                SystemCommandExecutor::new(),
                config.tts.command.clone(),
                config.tts.sample_rate,
            );
            let mut pipeline = Pipeline::new(
                config,
                SystemCommandExecutor::new(),
                Box::new(synthesizer),
                Box::new(LogSink),
            )?;

            let job = PipelineJob {
                audio,
                manual_text: text.unwrap_or_default(),
                engine,
                target_langs: langs,
                stages: StageSet {
                    asr: !no_asr,
                    clean: !no_clean,
                    translate: !no_translate,
                    tts: !no_tts,
                },
                ref_audio,
                ref_text,
            };

            let mut monitor = ResourceMonitor::start();
            let report = pipeline.run(&job, &CancelToken::new())?;
            let resources = monitor.snapshot();
            monitor.stop();
            log::debug!(
                "resources at completion: cpu {:.0}%, memory {:.0}%, disk {:.0}%",
                resources.cpu,
                resources.memory,
                resources.disk
            );
            print_report(&report);
        }
        Commands::Engines => {
            let config = Config::load_or_default(&config_path)?.with_env_overrides();
            if config.engines.is_empty() {
                println!("No engines configured ({}).", config_path.display());
            }
            for (name, target) in &config.engines {
                let auth = if target.requires_auth { "auth" } else { "no auth" };
                println!("{:<16} {} ({})", name, target.address, auth);
            }
        }
        Commands::Extract { sent } => {
            let mut raw = String::new();
            std::io::stdin().read_to_string(&mut raw)?;
            println!("{}", extract_reply(&raw, &sent));
        }
        Commands::Check => {
            check_tools();
        }
    }

    Ok(())
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_report(report: &s2ts::pipeline::PipelineReport) {
    println!("Project: {}", report.project_dir.display());
    if report.cancelled {
        println!("Run cancelled; partial results above.");
    }
    if let Some(asr) = &report.asr {
        println!("ASR       {} ({} chars)", secfmt(asr.elapsed), asr.output.len());
    }
    if let Some(clean) = &report.clean {
        let note = if clean.timed_out { ", timed out" } else { "" };
        println!("Clean     {}{} ({} chars)", secfmt(clean.elapsed), note, clean.output.len());
    }
    for (lang, stage) in &report.translations {
        let note = if stage.timed_out { ", timed out" } else { "" };
        println!(
            "Translate {} {}{} ({} chars)",
            lang,
            secfmt(stage.elapsed),
            note,
            stage.output.len()
        );
    }
    for (lang, tts) in &report.tts {
        println!("TTS       {} {} -> {}", lang, secfmt(tts.elapsed), tts.path.display());
    }
}

/// Probe required external tools, mirroring what a pipeline run will invoke.
fn check_tools() {
    use s2ts::bridge::CommandExecutor;

    let executor = SystemCommandExecutor::new();
    let tools: [(&str, &[&str], &str); 4] = [
        ("wl-copy", &["--version"], "clipboard writes (wl-clipboard)"),
        ("wl-paste", &["--version"], "clipboard reads (wl-clipboard)"),
        ("ydotool", &["--help"], "key and pointer injection"),
        ("grim", &["-h"], "debug screenshots"),
    ];

    let mut all_ok = true;
    for (tool, args, purpose) in tools {
        match executor.execute(tool, args) {
            Ok(_) => println!("ok       {:<10} {}", tool, purpose),
            Err(e) => {
                all_ok = false;
                println!("missing  {:<10} {} — {}", tool, purpose, e);
            }
        }
    }
    if all_ok {
        println!("All automation tools available.");
    }
}
