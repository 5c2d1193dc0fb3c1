//! CLI inspector for table files, in the spirit of the teacher's
//! `espikey-tool`: given a path, print the footer, properties, index, and
//! every decoded entry.

use std::path::PathBuf;

use clap::Parser;
use itertools::Itertools;
use log::info;

use sstable_reader::block::read_block;
use sstable_reader::properties::{index_type, meta_index_entries};
use sstable_reader::{ByteSource, EntryIterator, FileByteSource, Footer};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct SstDump {
    /// Path to a table file.
    file: PathBuf,

    /// Print key/value bytes as hex instead of a lossy ASCII rendering.
    #[clap(short, long, default_value_t = false)]
    raw: bool,

    /// Verify block checksums while reading.
    #[clap(long, default_value_t = false)]
    verify_checksums: bool,
}

fn encode_bytes_to_hex(data: &[u8]) -> String {
    data.iter().map(|byte| format!("{:02x}", byte)).join(" ")
}

fn show_bytes(prefix: &str, data: &[u8], raw: bool) {
    if raw {
        println!("{}{}", prefix, encode_bytes_to_hex(data));
        return;
    }
    print!("{}\"", prefix);
    for byte in data {
        if byte.is_ascii_graphic() {
            print!("{}", *byte as char);
        } else {
            print!(".");
        }
    }
    println!("\"");
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = SstDump::parse();

    let source = FileByteSource::open(&args.file)?;
    info!("opened {} ({} bytes)", args.file.display(), source.length());

    let footer = Footer::read_from(&source)?;
    println!("footer:");
    println!(
        "    meta_index_handle: offset={} length={}",
        footer.meta_index_handle.offset, footer.meta_index_handle.length
    );
    println!(
        "    index_handle:      offset={} length={}",
        footer.index_handle.offset, footer.index_handle.length
    );
    println!("    version:           {}", footer.version);
    println!("    checksum_kind:     {:?}", footer.checksum_kind());

    let properties = sstable_reader::read_properties(&source, &footer, args.verify_checksums)?;
    println!("properties:");
    for (key, value) in properties.iter().sorted_by(|a, b| a.0.cmp(&b.0)) {
        print!("    ");
        show_bytes("", key, args.raw);
        print!("      = ");
        show_bytes("", value, args.raw);
    }
    println!("    index_type: {:?}", index_type(&properties)?);

    let meta_index_data = read_block(&source, &footer.meta_index_handle, args.verify_checksums)?;
    println!("meta index:");
    for (name, handle) in meta_index_entries(&meta_index_data)? {
        println!(
            "    {} -> offset={} length={}",
            String::from_utf8_lossy(&name),
            handle.offset,
            handle.length
        );
    }

    println!("entries:");
    let mut count = 0usize;
    for entry in EntryIterator::open(&source, args.verify_checksums)? {
        let entry = entry?;
        print!("    ");
        show_bytes("key=", &entry.key, args.raw);
        print!("        ");
        show_bytes("value=", &entry.value, args.raw);
        println!("        sequence={} kind={}", entry.sequence, entry.kind);
        count += 1;
    }
    println!("total entries: {}", count);

    source.close();
    Ok(())
}
