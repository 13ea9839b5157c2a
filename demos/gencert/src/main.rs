// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Writes a self-signed certificate and private key to disk, for
//! standing up a `tls:`/`utls:` listener in tests without a real CA.
//! Not part of the server; certificate generation is out of scope for
//! `pathfinderd` itself.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let mut args = env::args().skip(1);
    let (Some(cert_path), Some(key_path)) = (args.next(), args.next()) else {
        eprintln!("usage: gencert <cert.pem> <key.pem> [hostname ...]");
        return ExitCode::FAILURE;
    };
    let hostnames: Vec<String> = args.collect();
    let hostnames = if hostnames.is_empty() { vec!["localhost".to_string()] } else { hostnames };

    match rcgen::generate_simple_self_signed(hostnames) {
        Ok(cert) => {
            if let Err(err) = write(&cert_path, cert.cert.pem()) {
                eprintln!("writing {cert_path}: {err}");
                return ExitCode::FAILURE;
            }
            if let Err(err) = write(&key_path, cert.key_pair.serialize_pem()) {
                eprintln!("writing {key_path}: {err}");
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("certificate generation failed: {err}");
            ExitCode::FAILURE
        }
    }
}

fn write(path: &str, contents: String) -> std::io::Result<()> {
    fs::write(PathBuf::from(path), contents)
}
