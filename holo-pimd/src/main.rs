//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

#![warn(rust_2018_idioms)]

mod config;

use capctl::caps;
use clap::{App, Arg};
use config::{AddressFamily, Config};
use holo_pim::instance::PimNode;
use holo_pim::version::{Pimv4, Pimv6};
use nix::unistd::{Uid, User};
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_subscriber::Layer;
use tracing_subscriber::prelude::*;

fn init_tracing(config: &config::Logging) {
    let journald = config
        .journald
        .enabled
        .then(|| tracing_journald::layer().expect("couldn't connect to journald"));

    let stdout = config.stdout.enabled.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_filter(LevelFilter::from_level(tracing::Level::TRACE))
    });

    let env_filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive("holo_pim=debug".parse().unwrap())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(journald)
        .with(stdout)
        .init();
}

fn privdrop(user: &str) -> nix::Result<()> {
    capctl::prctl::set_securebits(capctl::prctl::Secbits::KEEP_CAPS).unwrap();

    if let Some(user) = User::from_name(user)? {
        nix::unistd::setgroups(&[user.gid])?;
        nix::unistd::setresgid(user.gid, user.gid, user.gid)?;
        nix::unistd::setresuid(user.uid, user.uid, user.uid)?;
    } else {
        error!(name = %user, "failed to find user");
        std::process::exit(1);
    }

    let mut caps = caps::CapState::empty();
    for cap in [
        caps::Cap::NET_ADMIN,
        caps::Cap::NET_RAW,
    ] {
        caps.permitted.add(cap);
    }
    if let Err(error) = caps.set_current() {
        error!(%error, "failed to set permitted capabilities");
    }

    Ok(())
}

fn main() {
    let matches = App::new("PIM-SM routing daemon")
        .version(clap::crate_version!())
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("file")
                .help("Specify an alternative configuration file."),
        )
        .get_matches();

    let config_file = matches.value_of("config");
    let config = Config::load(config_file);

    if !Uid::effective().is_root() {
        eprintln!("need privileged user");
        std::process::exit(1);
    }

    init_tracing(&config.logging);

    if let Err(error) = privdrop(&config.user) {
        error!(%error, "failed to drop root privileges");
        std::process::exit(1);
    }

    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        default_panic(info);
        std::process::exit(1);
    }));

    info!("starting up");

    let instance_cfg = config.instance.clone();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("failed to create async runtime");

    match config.address_family {
        AddressFamily::Ipv4 => {
            let mut node = PimNode::<Pimv4>::new(instance_cfg);
            node.apply_config();
            runtime.block_on(run(node));
        }
        AddressFamily::Ipv6 => {
            let mut node = PimNode::<Pimv6>::new(instance_cfg);
            node.apply_config();
            runtime.block_on(run(node));
        }
    }
}

async fn run<V: holo_pim::version::Version>(mut node: PimNode<V>) {
    let mut tick = tokio::time::interval(std::time::Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = tick.tick() => {
                let now = std::time::Instant::now();
                node.expire_neighbors(now);
                node.expire_downstream_timers(now);
                node.expire_cand_rps(now);
                node.poll_hello_timers(now);
                node.poll_bsr_timers(now);
                node.drain_tasks(64);
            }
            event = node.event_rx.recv() => {
                match event {
                    Some(holo_pim::instance::Event::Packet { vif, src, message }) => {
                        node.handle_message(vif, src, message);
                    }
                    Some(holo_pim::instance::Event::Membership { vif, source, group, present }) => {
                        if present {
                            node.add_membership(vif, source, group);
                        } else {
                            node.delete_membership(vif, source, group);
                        }
                    }
                    Some(holo_pim::instance::Event::MfcUpcall(upcall)) => {
                        node.handle_upcall(upcall);
                    }
                    None => break,
                }
            }
            Some((vif, dst, message)) = node.out_rx.recv() => {
                if let Err(error) = node.transmit(vif, dst, message).await {
                    tracing::warn!(%error, "failed to transmit PIM message");
                }
            }
        }
    }
}
