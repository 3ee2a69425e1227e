// Copyright 2025 Chris Custine
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use env_logger::{Builder, Env, Target};
use log::warn;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Initialize the global logger.
///
/// `RUST_LOG` overrides the default `info` level. With a `log_file` the
/// records are appended to that file instead of stderr.
pub fn init(log_file: Option<&Path>) -> std::io::Result<()> {
    let mut builder = Builder::from_env(Env::default().default_filter_or("info"));

    builder.format(|buf, record| {
        let thread = std::thread::current();
        writeln!(
            buf,
            "{} {} {} {} {} : {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.module_path().unwrap_or("-"),
            record.line().unwrap_or(0),
            thread.name().unwrap_or("unnamed"),
            record.args()
        )
    });

    if let Some(path) = log_file {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        builder.target(Target::Pipe(Box::new(file)));
    }

    if let Err(e) = builder.try_init() {
        warn!("Logger already initialized: {}", e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_creates_log_file_and_tolerates_reinit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.log");

        init(Some(&path)).unwrap();
        assert!(path.exists());

        // The global logger is set at most once per process
        init(None).unwrap();
    }

    #[test]
    fn test_init_fails_on_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(init(Some(&dir.path().join("missing").join("app.log"))).is_err());
    }
}
