//! minidb shell - a line-oriented SQL REPL.
//!
//! Reads statements terminated by `;`, executes them against the database
//! in the data directory given as the first argument (default `./data`),
//! and prints results as aligned tables.

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use minidb::{Database, Error, QueryResult};

fn main() -> ExitCode {
    init_logging();

    let data_dir = std::env::args().nth(1).unwrap_or_else(|| "data".to_string());

    let mut db = match Database::open(&data_dir) {
        Ok(db) => db,
        Err(e) => {
            eprintln!("cannot open database at '{}'", data_dir);
            print_error(&e);
            return ExitCode::FAILURE;
        }
    };

    println!("minidb v{} (data: {})", env!("CARGO_PKG_VERSION"), data_dir);
    println!("Enter SQL terminated by ';'. \\h for help, \\q to quit.\n");

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "sql> " } else { "  -> " };
        print!("{}", prompt);
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(e) => {
                eprintln!("error reading input: {}", e);
                break;
            }
        }

        let trimmed = line.trim();
        if buffer.is_empty() {
            match trimmed {
                "" => continue,
                "\\q" => break,
                "\\h" => {
                    print_help();
                    continue;
                }
                _ => {}
            }
        }

        buffer.push_str(&line);
        if !trimmed.ends_with(';') {
            continue;
        }

        let sql = std::mem::take(&mut buffer);
        match db.execute(&sql) {
            Ok(result) => print_result(&result),
            Err(e) => print_error(&e),
        }
    }

    if let Err(e) = db.close() {
        print_error(&e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn print_error(error: &Error) {
    eprintln!("error: {}: {}", error.kind(), error.message());
}

fn print_result(result: &QueryResult) {
    if !result.columns.is_empty() {
        print!("{}", result.format_table());
    } else if result.affected > 0 {
        println!(
            "{} ({} row{} affected)",
            result.status,
            result.affected,
            if result.affected == 1 { "" } else { "s" }
        );
    } else {
        println!("{}", result.status);
    }
}

fn print_help() {
    println!("Statements end with ';'. Supported SQL:");
    println!("  CREATE TABLE t (col TYPE [PRIMARY KEY|UNIQUE|NOT NULL|DEFAULT v], ...)");
    println!("  CREATE [UNIQUE] INDEX name ON t (col)   DROP TABLE t   DROP INDEX name");
    println!("  INSERT INTO t [(cols)] VALUES (...), ...");
    println!("  SELECT ... FROM t [JOIN|LEFT JOIN u ON ...] [WHERE] [GROUP BY] [HAVING]");
    println!("         [ORDER BY] [LIMIT] [OFFSET]");
    println!("  UPDATE t SET col = expr [WHERE]   DELETE FROM t [WHERE]");
    println!("  SHOW TABLES   DESCRIBE t   TRUNCATE TABLE t");
    println!("Commands: \\h help, \\q quit");
}

fn init_logging() {
    let level = std::env::var("MINIDB_LOG")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(log::LevelFilter::Warn);
    let _ = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{} {}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply();
}
