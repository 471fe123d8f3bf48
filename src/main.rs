// Copyright 2026 by Michael Thies <mail@mhthies.de>
//
// Licensed under the Apache License, Version 2.0 (the "License"); you may not use this file except in compliance with
// the License. You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied. See the License for the
// specific language governing permissions and limitations under the License.

use std::fs::File;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use log::{debug, error, info, warn};

use exmerge::io::simple::RoomRow;
use exmerge::{io, report, solver, SolveResult, SolverError, Subproblem};

fn main() {
    // Setup logging & parse command line arguments
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!(
        "This is the Examination Room Merge Optimizer (exmerge), version {}",
        option_env!("CARGO_PKG_VERSION").unwrap_or("unknown")
    );
    let args = parse_cli_args();

    if args.get_one::<String>("OUTPUT").is_none() && !args.get_flag("print") {
        warn!(
            "No OUTPUT file and no --print option given. The consolidation plan will not be \
             exported anywhere."
        );
    }

    // Resolve the solver configuration: mode presets first, explicit flags override
    let mut config = match args.get_one::<String>("mode").map(|m| m.as_str()) {
        Some("fast") => solver::Config::for_mode(solver::Mode::Fast),
        Some("deep") => solver::Config::for_mode(solver::Mode::Deep),
        _ => solver::Config::default(),
    };
    if let Some(threshold) = args.get_one::<usize>("threshold") {
        config.size_threshold = *threshold;
    }
    if let Some(seconds) = args.get_one::<u64>("time_limit") {
        config.time_limit = Duration::from_secs(*seconds);
    }

    // Open and read input file
    let inpath: &String = args.get_one("INPUT").unwrap();
    debug!("Opening input file {} ...", inpath);
    let file = File::open(inpath).unwrap_or_else(|e| {
        error!("Could not open input file {}: {}", inpath, e);
        std::process::exit(exitcode::NOINPUT)
    });
    let rows = io::simple::read(file).unwrap_or_else(|e| {
        error!("Could not read input file: {}", e);
        std::process::exit(exitcode::DATAERR)
    });
    info!("Found {} room records.", rows.len());

    // Partition the table into independent (shift, campus) groups
    let groups = match Subproblem::partition(io::simple::into_records(rows.clone())) {
        Ok(groups) => groups,
        Err(e) => {
            error!("Could not build subproblems: {}", e);
            if args.get_flag("debug_dump") {
                dump_failing_group(&rows, &e);
            }
            std::process::exit(exitcode::DATAERR)
        }
    };
    info!("Total groups: {}", groups.len());

    // Solve the groups on a small worker pool. Each subproblem is solved strictly
    // single-threaded; the workers only share the index dispenser and the result slots.
    let num_threads = std::cmp::max(
        1,
        std::cmp::min(
            *args
                .get_one("num_threads")
                .unwrap_or(&(num_cpus::get() as u32)) as usize,
            groups.len(),
        ),
    );
    debug!("Solving {} groups on {} threads", groups.len(), num_threads);
    let next_group = AtomicUsize::new(0);
    let results: Mutex<Vec<Option<SolveResult>>> = Mutex::new(vec![None; groups.len()]);
    std::thread::scope(|scope| {
        for _ in 0..num_threads {
            scope.spawn(|| loop {
                let i = next_group.fetch_add(1, Ordering::SeqCst);
                if i >= groups.len() {
                    break;
                }
                let group = &groups[i];
                info!(
                    "Processing [{}/{}]: {} (n={})",
                    i + 1,
                    groups.len(),
                    group.key(),
                    group.len()
                );
                let result = solver::solve(group, &config);
                results.lock().unwrap()[i] = Some(result);
            });
        }
    });

    // Assemble the reports in deterministic group order
    let results = results.into_inner().unwrap();
    let mut reports = Vec::with_capacity(groups.len());
    for (group, result) in groups.iter().zip(results) {
        let result = result.expect("worker left a group unsolved");
        if cfg!(debug_assertions) {
            exmerge::assert_result_consistency(group, &result);
        }
        reports.push(report::build(group, &result));
    }
    let overall = report::summarize(&reports);
    info!(
        "Consolidated {} rooms into {} ({} saved, {:.1}% reduction).",
        overall.initial_rooms, overall.final_rooms, overall.rooms_saved, overall.efficiency_percent
    );

    if let Some(outpath) = args.get_one::<String>("OUTPUT") {
        debug!("Opening output file {} ...", outpath);
        match File::create(outpath) {
            Err(e) => error!("Could not open output file {}: {}.", outpath, e),
            Ok(file) => match io::simple::write(file, &reports, &overall) {
                Ok(_) => debug!("Consolidation plan written to {}.", outpath),
                Err(e) => error!("Could not write consolidation plan to {}: {}.", outpath, e),
            },
        }
    }

    if args.get_flag("print") {
        print!("{}", io::format_report(&reports, &overall));
    }
}

/// Write the rows of the group that failed validation to a JSON file next to the working
/// directory, so the offending table section can be inspected offline.
fn dump_failing_group(rows: &[RoomRow], error: &SolverError) {
    let room_id = match error {
        SolverError::InvalidInput { room, .. } => room,
        _ => return,
    };
    let offending = match rows.iter().find(|row| &row.room == room_id) {
        Some(row) => row,
        None => return,
    };
    let group_rows: Vec<RoomRow> = rows
        .iter()
        .filter(|row| {
            row.shift == offending.shift
                && row.campus == offending.campus
                && row.date == offending.date
        })
        .cloned()
        .collect();
    let dump_path = format!(
        "FAIL_shift_{}_campus_{}.json",
        offending.shift, offending.campus
    );
    match File::create(&dump_path) {
        Err(e) => error!("Could not open dump file {}: {}.", dump_path, e),
        Ok(file) => match io::simple::write_rows(file, &group_rows) {
            Ok(_) => info!("Dumped failing group to {}.", dump_path),
            Err(e) => error!("Could not dump failing group to {}: {}.", dump_path, e),
        },
    }
}

/// Helper function to construct and execute parser for command line options
fn parse_cli_args() -> clap::ArgMatches {
    clap::command!()
        .arg(
            clap::Arg::new("mode")
                .short('m')
                .long("mode")
                .help(
                    "Optimization mode preset: 'fast' always uses the greedy packer, 'deep' \
                     attempts the exact solver on groups of up to 200 rooms with a 600 second \
                     budget each. Without a mode, groups of up to 80 rooms are solved exactly \
                     with a 30 second budget.",
                )
                .value_parser(["fast", "deep"]),
        )
        .arg(
            clap::Arg::new("threshold")
                .long("threshold")
                .help(
                    "Maximum group size for which the exact solver is attempted. Overrides the \
                     mode preset.",
                )
                .value_name("ROOMS")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            clap::Arg::new("time_limit")
                .long("time-limit")
                .help(
                    "Wall-clock budget of one exact solve in seconds. Overrides the mode preset.",
                )
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            clap::Arg::new("num_threads")
                .long("num-threads")
                .help(
                    "Number of worker threads to solve independent groups on. Defaults to number \
                     of detected CPU cores.",
                )
                .value_name("THREADS")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            clap::Arg::new("debug_dump")
                .long("debug-dump")
                .help("Dump the rows of a group that fails validation to a JSON file")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("print")
                .short('p')
                .long("print")
                .help("Print the calculated consolidation plan to stdout in a human readable format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            clap::Arg::new("INPUT")
                .help("Sets the input file to use")
                .required(true)
                .index(1),
        )
        .arg(
            clap::Arg::new("OUTPUT")
                .help("Sets the output file to use")
                .index(2),
        )
        .get_matches()
}
