/*
 *  display/browser.rs
 *
 *  RadarPi - nearest aircraft on e-ink
 *	(c) 2025-26 RadarPi contributors
 *
 *  External rendering engine (headless browser screenshot)
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */
use log::{debug, warn};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::time::timeout;

use super::error::RenderError;

const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Runs an external program that turns a page into a PNG.
///
/// Arguments may contain `{url}` (file URL of the page), `{input}` (plain path of
/// the page), `{output}`, `{width}` and `{height}`.
#[derive(Debug, Clone)]
pub struct BrowserRasterizer {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    grace: Duration,
}

impl BrowserRasterizer {
    pub fn new(program: &str, args: &[String], timeout: Duration) -> Self {
        BrowserRasterizer {
            program: program.to_string(),
            args: args.to_vec(),
            timeout,
            grace: TERMINATE_GRACE,
        }
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn expand_args(&self, page: &Path, output: &Path, width: u32, height: u32) -> Vec<String> {
        let url = format!("file://{}", page.display());
        let input = page.display().to_string();
        let output = output.display().to_string();
        let (width, height) = (width.to_string(), height.to_string());
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{url}", &url)
                    .replace("{input}", &input)
                    .replace("{output}", &output)
                    .replace("{width}", &width)
                    .replace("{height}", &height)
            })
            .collect()
    }

    /// Rasterize `page` into `output`. The child is killed if this future is dropped.
    pub async fn rasterize(&self, page: &Path, output: &Path, width: u32, height: u32) -> Result<(), RenderError> {
        let args = self.expand_args(page, output, width, height);
        debug!("{} {}", self.program, args.join(" "));

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RenderError::EngineSpawn { program: self.program.clone(), source })?;

        match timeout(self.timeout, child.wait()).await {
            Ok(status) => exit_ok(status?),
            Err(_) => {
                warn!("{} exceeded {:?}, terminating", self.program, self.timeout);
                self.terminate(&mut child).await;
                Err(RenderError::EngineTimeout(self.timeout))
            }
        }
    }

    /// SIGTERM first, SIGKILL once the grace period runs out.
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            // SAFETY: pid belongs to a child we have not reaped yet
            unsafe {
                libc::kill(pid as libc::pid_t, libc::SIGTERM);
            }
            if timeout(self.grace, child.wait()).await.is_ok() {
                return;
            }
        }
        if let Err(e) = child.kill().await {
            warn!("failed to kill {}: {}", self.program, e);
        }
    }
}

fn exit_ok(status: ExitStatus) -> Result<(), RenderError> {
    if status.success() {
        Ok(())
    } else {
        Err(RenderError::EngineFailed(status.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_expand_args() {
        let b = BrowserRasterizer::new(
            "chromium",
            &args(&["--window-size={width},{height}", "--screenshot={output}", "{url}"]),
            Duration::from_secs(1),
        );
        let out = b.expand_args(Path::new("/tmp/page.html"), Path::new("/tmp/out.png"), 800, 480);
        assert_eq!(out, ["--window-size=800,480", "--screenshot=/tmp/out.png", "file:///tmp/page.html"]);
    }

    #[tokio::test]
    async fn test_engine_success() {
        let dir = tempfile::tempdir().unwrap();
        let page = dir.path().join("page.svg");
        let output = dir.path().join("out.png");
        std::fs::write(&page, b"payload").unwrap();

        let b = BrowserRasterizer::new("cp", &args(&["{input}", "{output}"]), Duration::from_secs(5));
        b.rasterize(&page, &output, 800, 480).await.unwrap();
        assert_eq!(std::fs::read(&output).unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_engine_failure() {
        let b = BrowserRasterizer::new("false", &[], Duration::from_secs(5));
        let err = b.rasterize(Path::new("/tmp/x"), Path::new("/tmp/y"), 1, 1).await.unwrap_err();
        assert!(matches!(err, RenderError::EngineFailed(_)));
    }

    #[tokio::test]
    async fn test_engine_missing() {
        let b = BrowserRasterizer::new("/nonexistent/radarpi-browser", &[], Duration::from_secs(5));
        let err = b.rasterize(Path::new("/tmp/x"), Path::new("/tmp/y"), 1, 1).await.unwrap_err();
        assert!(matches!(err, RenderError::EngineSpawn { .. }));
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_engine_timeout_terminates() {
        let dir = tempfile::tempdir().unwrap();
        let rec = dir.path().join("pid.rec");
        let script = format!("echo $$ > {}; exec sleep 30", rec.display());
        let b = BrowserRasterizer::new("sh", &args(&["-c", &script]), Duration::from_millis(500))
            .with_grace(Duration::from_secs(2));

        let started = Instant::now();
        let err = b.rasterize(Path::new("/tmp/x"), Path::new("/tmp/y"), 1, 1).await.unwrap_err();
        assert!(matches!(err, RenderError::EngineTimeout(_)));
        assert!(started.elapsed() < Duration::from_secs(10));

        // terminate() waits on the child, so it is reaped by the time we get here
        let pid: i32 = std::fs::read_to_string(&rec).unwrap().trim().parse().unwrap();
        assert!(!Path::new(&format!("/proc/{pid}")).exists(), "engine {pid} not reaped");
    }
}
