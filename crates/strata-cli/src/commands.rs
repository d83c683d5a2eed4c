use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use strata_kv::FileKvStore;
use strata_orm::{Codec, ModelBucket};
use tracing::debug;

use crate::cli::*;
use crate::config::{BucketSpec, CliConfig};
use crate::document::{self, Document};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let path = cli.db.clone().unwrap_or_else(|| config.store.path.clone());
    let store = FileKvStore::open(&path)
        .with_context(|| format!("cannot open database {}", path.display()))?;
    debug!(db = %path.display(), entries = store.len(), "database opened");

    let codec = document::codec()?;
    match cli.command {
        Command::Put(args) => cmd_put(&store, &open_bucket(&codec, &config, &args.bucket)?, args),
        Command::Get(args) => cmd_get(&store, &open_bucket(&codec, &config, &args.bucket)?, args),
        Command::Delete(args) => {
            cmd_delete(&store, &open_bucket(&codec, &config, &args.bucket)?, args)
        }
        Command::Find(args) => cmd_find(&store, &open_bucket(&codec, &config, &args.bucket)?, args),
        Command::Scan(args) => cmd_scan(&store, &open_bucket(&codec, &config, &args.bucket)?, args),
    }?;

    store
        .flush()
        .with_context(|| format!("cannot write database {}", path.display()))
}

/// Build the bucket `name` with the indexes the configuration declares.
pub fn open_bucket(codec: &Arc<Codec>, config: &CliConfig, name: &str) -> anyhow::Result<ModelBucket> {
    build_bucket(codec, &config.bucket(name))
}

fn build_bucket(codec: &Arc<Codec>, spec: &BucketSpec) -> anyhow::Result<ModelBucket> {
    let mut bucket = ModelBucket::new::<Document>(Arc::clone(codec), &spec.name)
        .with_context(|| format!("bucket {:?}", spec.name))?
        .with_config(spec.bucket_config())?;
    for index in &spec.indexes {
        bucket = bucket
            .with_index(&index.name, document::field_indexer(&index.field), index.unique)
            .with_context(|| format!("index {:?} on bucket {:?}", index.name, spec.name))?;
    }
    Ok(bucket)
}

fn cmd_put(store: &FileKvStore, bucket: &ModelBucket, args: PutArgs) -> anyhow::Result<()> {
    let doc = Document::parse(&args.json)?;
    let key = args.key.as_deref().map(parse_key).transpose()?;
    let key = bucket.put(store, key.as_deref(), doc)?;
    println!("{} Stored {}", "✓".green().bold(), format_key(&key).yellow());
    Ok(())
}

fn cmd_get(store: &FileKvStore, bucket: &ModelBucket, args: KeyArgs) -> anyhow::Result<()> {
    let key = parse_key(&args.key)?;
    let doc: Document = bucket.one(store, &key)?;
    println!("{}", pretty(&doc)?);
    Ok(())
}

fn cmd_delete(store: &FileKvStore, bucket: &ModelBucket, args: KeyArgs) -> anyhow::Result<()> {
    let key = parse_key(&args.key)?;
    bucket.delete(store, &key)?;
    println!("{} Deleted {}", "✓".green().bold(), format_key(&key).yellow());
    Ok(())
}

fn cmd_find(store: &FileKvStore, bucket: &ModelBucket, args: FindArgs) -> anyhow::Result<()> {
    let mut docs: Vec<Document> = Vec::new();
    let keys = bucket.by_index(store, &args.index, args.value.as_bytes(), &mut docs)?;
    if keys.is_empty() {
        println!("No documents with {} = {}.", args.index.bold(), args.value);
        return Ok(());
    }
    for (key, doc) in keys.iter().zip(&docs) {
        println!("{}  {}", format_key(key).yellow(), doc.body());
    }
    Ok(())
}

fn cmd_scan(store: &FileKvStore, bucket: &ModelBucket, args: ScanArgs) -> anyhow::Result<()> {
    let prefix = args.prefix.as_deref().map(parse_key).transpose()?.unwrap_or_default();
    let objs = bucket.bucket().scan(store, &prefix, args.reverse)?;
    if objs.is_empty() {
        println!("Bucket {} is empty.", args.bucket.bold());
        return Ok(());
    }
    for obj in &objs {
        let doc = obj
            .value_as::<Document>()
            .context("bucket holds a non-document row")?;
        println!("{}  {}", format_key(obj.key()).yellow(), doc.body());
    }
    Ok(())
}

fn pretty(doc: &Document) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(&doc.value()?)?)
}

/// `0x`-prefixed input is hex, anything else is taken as UTF-8 bytes.
pub fn parse_key(input: &str) -> anyhow::Result<Vec<u8>> {
    match input.strip_prefix("0x") {
        Some(digits) => hex::decode(digits).with_context(|| format!("invalid hex key {input:?}")),
        None => Ok(input.as_bytes().to_vec()),
    }
}

/// Printable keys are shown as text, everything else as `0x` hex. The
/// output always parses back with [`parse_key`].
pub fn format_key(key: &[u8]) -> String {
    let printable = !key.is_empty() && key.iter().all(|b| b.is_ascii_graphic());
    if printable && !key.starts_with(b"0x") {
        String::from_utf8_lossy(key).into_owned()
    } else {
        format!("0x{}", hex::encode(key))
    }
}
