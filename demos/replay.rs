// Copyright (C) 2025 FZI Forschungszentrum Informatik
// SPDX-License-Identifier: Apache-2.0
//! Replay of a captured frame
//!
//!     Usage: replay [--params FILE] [--describe] [--disassemble] DUMP
//!
//! This program loads a dump file, replays its complete packet stream and
//! prints one line per reconstructed draw call followed by one line per draw
//! group. Parameters may be supplied in the form of a TOML file (such as
//! `params.toml` in this directory).
//!
//! With `--describe`, every packet is listed below its draw call together
//! with its log. With `--disassemble`, the vertex and pixel shaders bound at
//! each draw are listed the first time they are encountered.
//!
//! Diagnostics are written to stderr and filtered through `RUST_LOG`, e.g.
//! `RUST_LOG=xenon_gpu_replay=debug`.

use std::collections::HashSet;
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use xenon_gpu_replay::shader::Stage;
use xenon_gpu_replay::{config, draw, dump};

#[derive(Parser, Debug)]
#[command(name = "replay", about = "Replay a captured Xenon GPU frame")]
struct Args {
    /// Dump file to replay
    dump: PathBuf,

    /// Parameter file in TOML format
    #[arg(long, value_name = "FILE", env = "XENON_REPLAY_PARAMS")]
    params: Option<PathBuf>,

    /// List every packet with its description and log
    #[arg(long, action = clap::ArgAction::SetTrue)]
    describe: bool,

    /// List the disassembly of every bound shader
    #[arg(long, action = clap::ArgAction::SetTrue)]
    disassemble: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut params: config::Parameters = args
        .params
        .as_ref()
        .map(|p| {
            let params = std::fs::read_to_string(p).expect("Could not load parameters");
            toml::from_str(params.as_ref()).expect("Could not parse parameters")
        })
        .unwrap_or_default();
    params.describe |= args.describe;
    tracing::debug!(?params, "Parameters");

    let dump = dump::Dump::open(&args.dump).expect("Could not load dump");
    if let Some(root) = dump.root() {
        tracing::info!(tag = %root.tag, packets = dump.packets().len(), "Loaded dump");
    }

    let reconstructor = draw::builder()
        .with_params(&params)
        .with_fallback(&dump)
        .build();
    let replay = reconstructor.replay(dump.packets());

    let mut shown = HashSet::new();
    for call in replay.calls() {
        println!("{call}");

        if params.describe {
            for packet in call.packets() {
                println!("  {}: {packet}", packet.index());
                let log = packet.record().map(|r| r.log.as_slice()).unwrap_or_default();
                log.iter().for_each(|line| println!("    {line}"));
            }
        }

        let Some(capture) = call.capture().filter(|_| args.disassemble) else {
            continue;
        };
        for stage in [Stage::Vertex, Stage::Pixel] {
            let Some(block) = capture.shader(stage) else {
                continue;
            };
            if !shown.insert((stage, block.id())) {
                continue;
            }
            match reconstructor.cache().get_or_decompile(stage, block) {
                Some(shader) => {
                    println!("  {stage} shader {}:", block.id());
                    shader.lines().iter().for_each(|l| println!("    {l}"));
                }
                None => println!("  {stage} shader {}: <invalid>", block.id()),
            }
        }
    }

    for group in replay.groups() {
        println!("Group {}: {group}", group.index());
        if params.describe {
            println!("{}", group.viewport());
            println!("{}", group.render_targets());
        }
    }

    eprintln!(
        "Replayed {} packets: {} draw calls in {} groups, {} shaders",
        dump.packets().len(),
        replay.calls().len(),
        replay.groups().len(),
        reconstructor.cache().len()
    );
}
