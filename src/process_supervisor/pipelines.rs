//! ffmpeg / mpv / ffplay command lines for view, record and relay pipelines

use super::binary_resolver::BinaryResolver;
use super::fallback::Tier;
use super::spawner::CommandSpec;
use crate::bitrate_policy::EncoderRates;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const PRIMARY_PLAYER: &str = "mpv";
const SECONDARY_PLAYER: &str = "ffplay";
const ENCODER: &str = "ffmpeg";

/// Player window title
pub fn view_title(code: &str, server: &str) -> String {
    format!("RTSP: {} (server: {})", code, server)
}

fn mpv_args(url: &str, title: &str) -> Vec<String> {
    vec![
        "--rtsp-transport=tcp".into(),
        url.into(),
        format!("--title={}", title),
        "--volume=50".into(),
        "--force-window=yes".into(),
        "--no-terminal".into(),
        "--geometry=50%".into(),
        "--osd-level=1".into(),
    ]
}

fn ffplay_args(url: &str, title: &str) -> Vec<String> {
    [
        "-rtsp_transport", "tcp", "-i", url, "-x", "640", "-y", "480", "-window_title", title,
        "-volume", "50",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Player fallback chain: every resolved mpv location, then every ffplay location
pub fn view_tiers(resolver: &BinaryResolver, url: &str, title: &str) -> Vec<Tier> {
    let mpv = resolver.candidates(PRIMARY_PLAYER).into_iter().map(|path| {
        Tier::new(
            PRIMARY_PLAYER,
            CommandSpec::new(path).args(mpv_args(url, title)),
        )
    });
    let ffplay = resolver
        .candidates(SECONDARY_PLAYER)
        .into_iter()
        .map(|path| {
            Tier::new(
                SECONDARY_PLAYER,
                CommandSpec::new(path).args(ffplay_args(url, title)),
            )
        });
    mpv.chain(ffplay).collect()
}

/// One recording encode/container strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStrategy {
    /// Stream copy into fragmented MP4
    Fmp4Copy,
    /// H.264/AAC re-encode into MP4
    Mp4Transcode,
    /// Stream copy into MPEG-TS
    MpegTsCopy,
    /// Stream copy into Matroska
    MatroskaCopy,
}

impl RecordingStrategy {
    pub const ALL: [RecordingStrategy; 4] = [
        RecordingStrategy::Fmp4Copy,
        RecordingStrategy::Mp4Transcode,
        RecordingStrategy::MpegTsCopy,
        RecordingStrategy::MatroskaCopy,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStrategy::Fmp4Copy => "fmp4_copy",
            RecordingStrategy::Mp4Transcode => "mp4_transcode",
            RecordingStrategy::MpegTsCopy => "mpegts_copy",
            RecordingStrategy::MatroskaCopy => "matroska_copy",
        }
    }

    /// Output file name for a session stem (`{code}_{timestamp}`)
    pub fn file_name(&self, stem: &str) -> String {
        match self {
            RecordingStrategy::Fmp4Copy => format!("{}.mp4", stem),
            RecordingStrategy::Mp4Transcode => format!("{}_transcode.mp4", stem),
            RecordingStrategy::MpegTsCopy => format!("{}.ts", stem),
            RecordingStrategy::MatroskaCopy => format!("{}.mkv", stem),
        }
    }

    pub fn args(&self, url: &str, rates: &EncoderRates, output: &Path) -> Vec<String> {
        let mut args: Vec<String> = vec!["-rtsp_transport".into(), "tcp".into(), "-i".into(), url.into()];
        let tail: Vec<String> = match self {
            RecordingStrategy::Fmp4Copy => vec![
                "-c:v", "copy", "-c:a", "copy", "-bsf:a", "aac_adtstoasc", "-f", "mp4",
                "-movflags", "+faststart+frag_keyframe+empty_moov", "-frag_duration", "1000000",
                "-avoid_negative_ts", "make_zero",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            RecordingStrategy::Mp4Transcode => {
                let mut v: Vec<String> = [
                    "-c:v", "libx264", "-preset", "veryfast", "-tune", "zerolatency", "-profile:v",
                    "main", "-level", "4.0", "-pix_fmt", "yuv420p", "-r", "30", "-g", "60",
                    "-keyint_min", "60", "-sc_threshold", "0",
                ]
                .into_iter()
                .map(String::from)
                .collect();
                v.extend([
                    "-b:v".to_string(),
                    rates.bitrate_arg(),
                    "-maxrate".to_string(),
                    rates.maxrate_arg(),
                    "-bufsize".to_string(),
                    rates.bufsize_arg(),
                ]);
                v.extend(
                    [
                        "-c:a", "aac", "-b:a", "192k", "-ar", "48000", "-af",
                        "aresample=async=1000", "-f", "mp4", "-movflags", "+faststart",
                    ]
                    .into_iter()
                    .map(String::from),
                );
                v
            }
            RecordingStrategy::MpegTsCopy => ["-c:v", "copy", "-c:a", "copy", "-f", "mpegts"]
                .into_iter()
                .map(String::from)
                .collect(),
            RecordingStrategy::MatroskaCopy => ["-c:v", "copy", "-c:a", "copy", "-f", "matroska"]
                .into_iter()
                .map(String::from)
                .collect(),
        };
        args.extend(tail);
        args.push("-y".into());
        args.push(output.display().to_string());
        args
    }
}

/// Which recording tiers to try, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingChain {
    /// fMP4 copy, MP4 transcode, MPEG-TS copy, Matroska copy
    #[default]
    Standard,
    /// MP4 transcode, Matroska copy
    TranscodeFirst,
}

impl RecordingChain {
    pub fn strategies(&self) -> &'static [RecordingStrategy] {
        match self {
            RecordingChain::Standard => &[
                RecordingStrategy::Fmp4Copy,
                RecordingStrategy::Mp4Transcode,
                RecordingStrategy::MpegTsCopy,
                RecordingStrategy::MatroskaCopy,
            ],
            RecordingChain::TranscodeFirst => &[
                RecordingStrategy::Mp4Transcode,
                RecordingStrategy::MatroskaCopy,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingChain::Standard => "standard",
            RecordingChain::TranscodeFirst => "transcode_first",
        }
    }
}

impl std::str::FromStr for RecordingChain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" | "mp4_first" => Ok(RecordingChain::Standard),
            "transcode_first" | "transcode" => Ok(RecordingChain::TranscodeFirst),
            other => Err(format!("unknown recording chain '{}'", other)),
        }
    }
}

/// Paths shared by every tier of one recording session
#[derive(Debug, Clone)]
pub struct RecordingPaths {
    pub recordings_dir: PathBuf,
    pub stem: String,
    pub log_path: PathBuf,
}

impl RecordingPaths {
    /// `{dir}/{code}_{timestamp}.*` outputs and `{dir}/logs/{code}_{timestamp}_log.txt`
    pub fn new(recordings_dir: &Path, code: &str, timestamp: &str) -> Self {
        let stem = format!("{}_{}", code, timestamp);
        let log_path = recordings_dir
            .join("logs")
            .join(format!("{}_log.txt", stem));
        Self {
            recordings_dir: recordings_dir.to_path_buf(),
            stem,
            log_path,
        }
    }

    /// Like `new`, but appends `_2`, `_3`, ... to the timestamp until no
    /// output or log of an earlier session has the same name
    pub fn allocate(recordings_dir: &Path, code: &str, timestamp: &str) -> Self {
        let mut paths = Self::new(recordings_dir, code, timestamp);
        let mut suffix = 2;
        while paths.is_taken() {
            paths = Self::new(recordings_dir, code, &format!("{}_{}", timestamp, suffix));
            suffix += 1;
        }
        paths
    }

    fn is_taken(&self) -> bool {
        self.log_path.exists()
            || RecordingStrategy::ALL
                .iter()
                .any(|s| self.recordings_dir.join(s.file_name(&self.stem)).exists())
    }
}

/// Recording tiers for `chain`, all logging into the session log
pub fn recording_tiers(
    resolver: &BinaryResolver,
    chain: RecordingChain,
    url: &str,
    rates: &EncoderRates,
    paths: &RecordingPaths,
) -> Vec<Tier> {
    let ffmpeg = resolver.resolve(ENCODER);
    chain
        .strategies()
        .iter()
        .map(|strategy| {
            let output = paths.recordings_dir.join(strategy.file_name(&paths.stem));
            let command = CommandSpec::new(ffmpeg.clone())
                .args(strategy.args(url, rates, &output))
                .log_to(&paths.log_path);
            Tier::new(strategy.as_str(), command).with_output(output)
        })
        .collect()
}

/// Relay (RTMP push) command
pub fn relay_command(
    resolver: &BinaryResolver,
    url: &str,
    destination: &str,
    rates: &EncoderRates,
) -> CommandSpec {
    CommandSpec::new(resolver.resolve(ENCODER))
        .args(["-re", "-timeout", "10000000", "-rtsp_transport", "tcp", "-i", url])
        .args(["-c:v", "libx264"])
        .args(["-b:v".to_string(), rates.bitrate_arg()])
        .args(["-maxrate".to_string(), rates.maxrate_arg()])
        .args(["-bufsize".to_string(), rates.bufsize_arg()])
        .args(["-preset", "veryfast", "-tune", "zerolatency"])
        .args(["-c:a", "aac", "-b:a", "128k", "-ar", "44100"])
        .args(["-f", "flv", destination])
}

/// `{endpoint}/{key}` with a single separator; the key is percent-encoded
pub fn relay_destination(endpoint: &str, key: &str) -> String {
    format!(
        "{}/{}",
        endpoint.trim_end_matches('/'),
        urlencoding::encode(key.trim_start_matches('/'))
    )
}
