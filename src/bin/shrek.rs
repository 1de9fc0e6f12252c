// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//    http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
use std::error::Error;
use std::fs;
use std::path::PathBuf;

use clap::{arg, Arg, Command};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

use shrek_lang::Config;

fn main() -> Result<(), Box<dyn Error>> {
    let matches = Command::new("shrek")
        .about("Shrek language interpreter")
        .version("0.1.0")
        .arg(Arg::new("file").required(true))
        .arg(arg!(--verbose "Show verbose output"))
        .arg(Arg::new("ext-dir").long("ext-dir").help("Directory scanned for extension libraries"))
        .arg(
            Arg::new("ext-suffix")
                .long("ext-suffix")
                .help("File extension (without the dot) marking an extension library"),
        )
        .get_matches();
    // Initialise logging
    if matches.is_present("verbose") {
        init_logging(LevelFilter::Debug);
    } else {
        init_logging(LevelFilter::Info);
    }
    // Extract the file to be run.
    let filename = matches.get_one::<String>("file").unwrap();
    // Read the source file
    let source = fs::read_to_string(filename)?;
    // Build the runtime configuration
    let mut config = Config::default();
    if let Some(dir) = matches.get_one::<String>("ext-dir") {
        config.extension_dir = PathBuf::from(dir);
    }
    if let Some(suffix) = matches.get_one::<String>("ext-suffix") {
        config.extension_suffix = suffix.clone();
    }
    // Run it. The program's own exit value becomes the process exit
    // code on success; a pipeline failure is reported and translated
    // to the exit code its stage calls for.
    match shrek_lang::run(&source, config) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

/// Initialise logging using a suitable pattern.
fn init_logging(level: LevelFilter) {
    let encoder = PatternEncoder::new("[{l}] {m}{n}");
    let stdout = ConsoleAppender::builder().encoder(Box::new(encoder)).build();
    let config = LogConfig::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))
        .unwrap();
    let _handle = log4rs::init_config(config).unwrap();
}
