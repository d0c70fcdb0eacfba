//! COS command-line client
//!
//! Signs tokens and runs directory and upload operations against a bucket.

use bytesize::ByteSize;
use clap::{Arg, ArgAction, Command};
use cos_client::storage::{ListOptions, ListOrder, ListPattern};
use cos_client::{CosClient, CosConfig, UploadOptions};
use log::LevelFilter;

fn parse_pair(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got {}", value))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("cos")
        .version(env!("CARGO_PKG_VERSION"))
        .about("COS object storage client")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("JSON configuration file")
                .default_value("cos.json")
                .global(true),
        )
        .arg(
            Arg::new("bucket")
                .short('b')
                .long("bucket")
                .help("Bucket to operate on (default: default-bucket from the config)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Verbose output")
                .action(ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("sign-once")
                .about("Print a single-use signature for a resource")
                .arg(Arg::new("path").help("Remote path").required(true)),
        )
        .subcommand(
            Command::new("sign-multiple")
                .about("Print a reusable bucket signature")
                .arg(
                    Arg::new("ttl")
                        .long("ttl")
                        .help("Lifetime in seconds (default: multiple-sign-expire)")
                        .value_parser(clap::value_parser!(i64)),
                ),
        )
        .subcommand(
            Command::new("sign-request")
                .about("Print the authorization headers of an HTTP request")
                .arg(Arg::new("method").help("HTTP method").required(true))
                .arg(Arg::new("uri").help("Request path").required(true))
                .arg(
                    Arg::new("param")
                        .long("param")
                        .help("Query parameter as key=value")
                        .action(ArgAction::Append)
                        .value_parser(parse_pair),
                )
                .arg(
                    Arg::new("header")
                        .long("header")
                        .help("Signed header as key=value")
                        .action(ArgAction::Append)
                        .value_parser(parse_pair),
                ),
        )
        .subcommand(
            Command::new("stat")
                .about("Show metadata of a directory or file")
                .arg(Arg::new("path").help("Remote path").required(true)),
        )
        .subcommand(
            Command::new("list")
                .about("List a directory")
                .arg(Arg::new("dir").help("Remote directory").default_value("/"))
                .arg(
                    Arg::new("pattern")
                        .long("pattern")
                        .help("Entries to list")
                        .value_parser(["both", "dir", "file"])
                        .default_value("both"),
                )
                .arg(
                    Arg::new("desc")
                        .long("desc")
                        .help("Reverse order")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("mkdir")
                .about("Create a directory")
                .arg(Arg::new("dir").help("Remote directory").required(true)),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a directory or file")
                .arg(Arg::new("path").help("Remote path").required(true)),
        )
        .subcommand(
            Command::new("upload")
                .about("Upload a local file, resuming an interrupted sliced upload")
                .arg(Arg::new("file").help("Local file").required(true))
                .arg(Arg::new("destination").help("Remote file path").required(true))
                .arg(
                    Arg::new("retry")
                        .long("retry")
                        .help("Attempts per request")
                        .value_parser(clap::value_parser!(u32)),
                )
                .arg(
                    Arg::new("min-slice-size")
                        .long("min-slice-size")
                        .help("Files at or above this many bytes are sliced")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(Arg::new("biz-attr").long("biz-attr").help("Business attribute"))
                .arg(
                    Arg::new("overwrite")
                        .long("overwrite")
                        .help("Replace an existing file")
                        .action(ArgAction::SetTrue),
                ),
        )
        .get_matches();

    let config_path = matches.get_one::<String>("config").unwrap();
    let config = CosConfig::from_file(config_path)?;

    let level = if matches.get_flag("verbose") {
        LevelFilter::Debug
    } else {
        config.log_level.into()
    };
    env_logger::Builder::new().filter_level(level).init();

    let client = CosClient::new(config)?;
    let bucket = || client.resolve_bucket(matches.get_one::<String>("bucket").map(String::as_str));

    match matches.subcommand() {
        Some(("sign-once", sub_matches)) => {
            let path = sub_matches.get_one::<String>("path").unwrap();
            println!("{}", client.signer().once(&bucket()?, path));
        }
        Some(("sign-multiple", sub_matches)) => {
            let ttl = sub_matches.get_one::<i64>("ttl").copied();
            println!("{}", client.signer().multiple(&bucket()?, ttl)?);
        }
        Some(("sign-request", sub_matches)) => {
            let method = sub_matches.get_one::<String>("method").unwrap();
            let uri = sub_matches.get_one::<String>("uri").unwrap();
            let params: Vec<(String, String)> = sub_matches
                .get_many::<(String, String)>("param")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();
            let mut headers: Vec<(String, String)> = sub_matches
                .get_many::<(String, String)>("header")
                .map(|values| values.cloned().collect())
                .unwrap_or_default();

            client
                .signer()
                .authorization(method, uri, &params, &mut headers);
            for (name, value) in headers {
                println!("{}: {}", name, value);
            }
        }
        Some(("stat", sub_matches)) => {
            let path = sub_matches.get_one::<String>("path").unwrap();
            let resource = cos_client::stat(&client, &bucket()?, path)?;
            println!("{}", serde_json::to_string_pretty(&resource)?);
        }
        Some(("list", sub_matches)) => {
            let dir = sub_matches.get_one::<String>("dir").unwrap();
            let pattern = match sub_matches.get_one::<String>("pattern").map(String::as_str) {
                Some("dir") => ListPattern::DirOnly,
                Some("file") => ListPattern::FileOnly,
                _ => ListPattern::Both,
            };
            let order = if sub_matches.get_flag("desc") {
                ListOrder::Desc
            } else {
                ListOrder::Asc
            };
            let options = ListOptions::new()
                .num(cos_client::storage::types::MAX_LIST_NUM)
                .pattern(pattern)
                .order(order);

            let entries = cos_client::list(&client, &bucket()?, dir, &options)?;
            for entry in &entries {
                match entry.size_string() {
                    Some(size) => println!("{:>12}  {}", size, entry.path),
                    None => println!("{:>12}  {}", "<dir>", entry.path),
                }
            }
            println!("{} entries", entries.len());
        }
        Some(("mkdir", sub_matches)) => {
            let dir = sub_matches.get_one::<String>("dir").unwrap();
            let resource = cos_client::create_folder(&client, &bucket()?, dir)?;
            println!("Created {}", resource.path);
        }
        Some(("delete", sub_matches)) => {
            let path = sub_matches.get_one::<String>("path").unwrap();
            cos_client::delete(&client, &bucket()?, path)?;
            println!("Deleted {}", path);
        }
        Some(("upload", sub_matches)) => {
            let file = sub_matches.get_one::<String>("file").unwrap();
            let destination = sub_matches.get_one::<String>("destination").unwrap();

            let mut options = UploadOptions::new()
                .insert_only(!sub_matches.get_flag("overwrite"))
                .on_progress(|progress| {
                    eprintln!(
                        "  slice {}/{}: {} / {} ({:.1}%)",
                        progress.current_chunk,
                        progress.total_chunks,
                        ByteSize::b(progress.bytes_uploaded),
                        ByteSize::b(progress.total_bytes),
                        progress.percentage * 100.0
                    );
                });
            if let Some(retry) = sub_matches.get_one::<u32>("retry") {
                options = options.upload_retry(*retry);
            }
            if let Some(size) = sub_matches.get_one::<u64>("min-slice-size") {
                options = options.min_slice_size(*size);
            }
            if let Some(biz_attr) = sub_matches.get_one::<String>("biz-attr") {
                options = options.biz_attr(biz_attr);
            }

            let result = cos_client::upload_file(&client, &bucket()?, destination, file, &options)?;
            println!(
                "Uploaded {} to {} in {} ms",
                ByteSize::b(result.size),
                result.destination,
                result.duration_ms
            );
            if result.resumed_from > 0 {
                println!("Resumed from byte {}", result.resumed_from);
            }
            if let Some(url) = result.access_url {
                println!("{}", url);
            }
        }
        _ => {
            eprintln!("No subcommand provided. Use --help for usage information.");
            std::process::exit(1);
        }
    }

    Ok(())
}
