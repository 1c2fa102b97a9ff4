// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line arguments for both binaries and their conversion into
// configuration and request values.
//
// Long flags keep their underscore spelling (`--image_path`, `--bundle_dir`)
// for compatibility with existing scripts; kebab-case aliases are accepted.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use idwire_core::config::{
    ClientConfig, DEFAULT_IO_TIMEOUT_SECS, DEFAULT_MAX_FRAME_BYTES, DEFAULT_PORT, OutputTarget,
    ServerConfig, timeout_from_secs,
};
use idwire_core::error::{IdwireError, Result};
use idwire_core::types::{
    CURRENT_DATE_OPTION, ClientMessage, DEFAULT_MODE, LogRequest, RecognitionRequest,
};

/// Date format the engine expects for `common.currentDate`.
const CURRENT_DATE_FORMAT: &str = "%d.%m.%Y";

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Parser, Debug, Clone)]
#[command(
    name = "idwire-server",
    version,
    about = "Serve document recognition requests over TCP"
)]
pub struct ServerArgs {
    /// Directory containing exactly one engine bundle (*.se)
    #[arg(short = 'b', long = "bundle_dir", visible_alias = "bundle-dir")]
    pub bundle_dir: PathBuf,

    /// Defer bundle loading to the first request (not for production use)
    #[arg(short = 'l', long)]
    pub lazy: bool,

    /// Simultaneous recognitions; 0 uses every available core
    #[arg(short = 'c', long, default_value_t = 0)]
    pub concur: usize,

    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Address to listen on
    #[arg(long, default_value = "0.0.0.0")]
    pub bind: String,

    /// Per-frame read/write deadline in seconds; 0 disables it
    #[arg(
        long = "io_timeout",
        visible_alias = "io-timeout",
        default_value_t = DEFAULT_IO_TIMEOUT_SECS
    )]
    pub io_timeout: u64,

    /// Largest request payload accepted, in bytes
    #[arg(
        long = "max_frame_bytes",
        visible_alias = "max-frame-bytes",
        default_value_t = DEFAULT_MAX_FRAME_BYTES
    )]
    pub max_frame_bytes: usize,
}

impl ServerArgs {
    pub fn to_config(&self) -> ServerConfig {
        ServerConfig {
            bundle_dir: self.bundle_dir.clone(),
            lazy_init: self.lazy,
            concurrency: self.concur,
            bind_addr: self.bind.clone(),
            port: self.port,
            io_timeout: timeout_from_secs(self.io_timeout),
            max_frame_bytes: self.max_frame_bytes,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Parser, Debug, Clone)]
#[command(
    name = "idwire-client",
    version,
    about = "Send one image to an idwire server and save the result"
)]
pub struct ClientArgs {
    /// Document type mask, e.g. `mrz.*` or `*`
    #[arg(long, default_value = "*")]
    pub mask: String,

    #[arg(long, default_value = DEFAULT_MODE)]
    pub mode: String,

    /// Session signature issued with the engine licence
    #[arg(short = 's', long, required_unless_present = "log")]
    pub signature: Option<String>,

    #[arg(
        short = 'i',
        long = "image_path",
        visible_alias = "image-path",
        required_unless_present = "log"
    )]
    pub image_path: Option<PathBuf>,

    /// Result directory, or `stdout`
    #[arg(short = 'o', long, default_value = "./result")]
    pub output: String,

    /// Run forensic checks
    #[arg(short = 'f', long)]
    pub forensics: bool,

    #[arg(short = 'e', long, default_value = "127.0.0.1")]
    pub endpoint: String,

    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Ask the server for its engine status instead of recognizing
    #[arg(short = 'l', long)]
    pub log: bool,

    /// Print the result instead of writing a file
    #[arg(short = 't', long)]
    pub stdout: bool,

    /// Extra session option as key=value (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    #[arg(long = "error_log", visible_alias = "error-log", default_value = "error.log")]
    pub error_log: PathBuf,

    /// Deadline in seconds for connecting and for each frame; 0 waits forever
    #[arg(long, default_value_t = DEFAULT_IO_TIMEOUT_SECS)]
    pub timeout: u64,

    /// Largest response payload accepted, in bytes
    #[arg(
        long = "max_frame_bytes",
        visible_alias = "max-frame-bytes",
        default_value_t = DEFAULT_MAX_FRAME_BYTES
    )]
    pub max_frame_bytes: usize,
}

impl ClientArgs {
    pub fn to_config(&self) -> ClientConfig {
        let output = if self.stdout {
            OutputTarget::Stdout
        } else {
            OutputTarget::parse(&self.output)
        };
        ClientConfig {
            endpoint: self.endpoint.clone(),
            port: self.port,
            output,
            error_log: self.error_log.clone(),
            io_timeout: timeout_from_secs(self.timeout),
            max_frame_bytes: self.max_frame_bytes,
        }
    }

    /// Build the message to send, reading the image from disk.
    pub fn message(&self, today: NaiveDate) -> Result<ClientMessage> {
        if self.log {
            return Ok(ClientMessage::Log(LogRequest::default()));
        }
        let path = self
            .image_path
            .as_deref()
            .ok_or_else(|| IdwireError::Config("--image_path is required".into()))?;
        let input = std::fs::read(path).map_err(|e| {
            IdwireError::Config(format!("cannot read image {}: {e}", path.display()))
        })?;
        self.recognition_request(input, today)
            .map(ClientMessage::Recognize)
    }

    /// Recognition request for `input`. `common.currentDate` is set to
    /// `today`; an explicit `--option` for the same key wins.
    pub fn recognition_request(
        &self,
        input: Vec<u8>,
        today: NaiveDate,
    ) -> Result<RecognitionRequest> {
        let signature = self
            .signature
            .as_deref()
            .ok_or_else(|| IdwireError::Config("--signature is required".into()))?;

        let mut request = RecognitionRequest::new(signature, input)
            .with_mode(&self.mode)
            .with_mask(&self.mask)
            .with_forensics(self.forensics)
            .with_option(
                CURRENT_DATE_OPTION,
                today.format(CURRENT_DATE_FORMAT).to_string(),
            );
        for (key, value) in &self.options {
            request = request.with_option(key, value);
        }
        Ok(request)
    }
}

fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_owned(), value.to_owned())),
        _ => Err(format!("expected KEY=VALUE, got `{raw}`")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::OsString;
    use std::time::Duration;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).unwrap()
    }

    #[test]
    fn server_defaults() {
        let args =
            ServerArgs::try_parse_from(["idwire-server", "--bundle_dir", "/opt/bundle"]).unwrap();
        let config = args.to_config();
        assert_eq!(config.bundle_dir, PathBuf::from("/opt/bundle"));
        assert!(!config.lazy_init);
        assert_eq!(config.concurrency, 0);
        assert_eq!(config.port, 53000);
        assert_eq!(config.io_timeout, Some(Duration::from_secs(60)));
    }

    #[test]
    fn server_requires_bundle_dir() {
        assert!(ServerArgs::try_parse_from(["idwire-server"]).is_err());
    }

    #[test]
    fn server_short_flags_and_disabled_timeout() {
        let args = ServerArgs::try_parse_from([
            "idwire-server", "-b", "b", "-l", "-c", "3", "-p", "6000", "--io_timeout", "0",
        ])
        .unwrap();
        let config = args.to_config();
        assert!(config.lazy_init);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.port, 6000);
        assert_eq!(config.io_timeout, None);
    }

    #[test]
    fn client_needs_signature_and_image_unless_logging() {
        assert!(ClientArgs::try_parse_from(["idwire-client"]).is_err());
        assert!(ClientArgs::try_parse_from(["idwire-client", "-s", "sig"]).is_err());
        assert!(ClientArgs::try_parse_from(["idwire-client", "--log"]).is_ok());
    }

    #[test]
    fn log_mode_sends_log_request() {
        let args = ClientArgs::try_parse_from(["idwire-client", "-l"]).unwrap();
        assert_eq!(
            args.message(today()).unwrap(),
            ClientMessage::Log(LogRequest { log: true })
        );
    }

    #[test]
    fn stdout_flag_overrides_output() {
        let args =
            ClientArgs::try_parse_from(["idwire-client", "-l", "-o", "out", "--stdout"]).unwrap();
        assert_eq!(args.to_config().output, OutputTarget::Stdout);

        let args = ClientArgs::try_parse_from(["idwire-client", "-l", "-o", "stdout"]).unwrap();
        assert_eq!(args.to_config().output, OutputTarget::Stdout);

        let args = ClientArgs::try_parse_from(["idwire-client", "-l"]).unwrap();
        assert_eq!(
            args.to_config().output,
            OutputTarget::Directory(PathBuf::from("./result"))
        );
    }

    #[test]
    fn request_carries_mask_date_and_extra_options() {
        let args = ClientArgs::try_parse_from([
            "idwire-client",
            "-s",
            "sig",
            "-i",
            "passport.png",
            "--mask",
            "mrz.*",
            "-f",
            "--option",
            "common.extractTemplateImages=true",
        ])
        .unwrap();

        let request = args.recognition_request(vec![1, 2, 3], today()).unwrap();
        assert_eq!(request.signature(), "sig");
        assert_eq!(request.mode(), "default");
        assert_eq!(request.mask(), ["mrz.*".to_owned()]);
        assert!(request.forensics());
        assert_eq!(request.options()["common.currentDate"], "16.10.2026");
        assert_eq!(request.options()["common.extractTemplateImages"], "true");
        assert_eq!(request.input(), [1, 2, 3]);
    }

    #[test]
    fn explicit_current_date_wins() {
        let args = ClientArgs::try_parse_from([
            "idwire-client",
            "-s",
            "sig",
            "-i",
            "x",
            "--option",
            "common.currentDate=01.01.2030",
        ])
        .unwrap();
        let request = args.recognition_request(Vec::new(), today()).unwrap();
        assert_eq!(request.options()["common.currentDate"], "01.01.2030");
    }

    #[test]
    fn malformed_option_is_rejected() {
        assert!(
            ClientArgs::try_parse_from(["idwire-client", "-l", "--option", "novalue"]).is_err()
        );
        assert_eq!(parse_key_value("a=b=c").unwrap(), ("a".into(), "b=c".into()));
    }

    #[test]
    fn image_is_read_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("doc.png");
        std::fs::write(&image, b"png bytes").unwrap();

        let args = ClientArgs::try_parse_from([
            OsString::from("idwire-client"),
            OsString::from("-s"),
            OsString::from("sig"),
            OsString::from("-i"),
            image.into_os_string(),
        ])
        .unwrap();
        let ClientMessage::Recognize(request) = args.message(today()).unwrap() else {
            panic!("expected a recognition request");
        };
        assert_eq!(request.input(), b"png bytes");

        let missing =
            ClientArgs::try_parse_from(["idwire-client", "-s", "sig", "-i", "/nonexistent/x.png"])
                .unwrap();
        assert!(matches!(missing.message(today()), Err(IdwireError::Config(_))));
    }
}
