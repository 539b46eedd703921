//! Generate seed corpus for fuzzing

use std::fs;
use zipvault::{compress, ArchiveOptions, DosDateTime, Payload};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let corpus_dir = "fuzz/corpus/fuzz_archive_parse";
    fs::create_dir_all(corpus_dir)?;

    println!("Generating seed corpus...");

    let fixed = ArchiveOptions {
        modified: Some(DosDateTime::new(2024, 6, 1, 12, 0, 0)?),
        ..ArchiveOptions::default()
    };

    let seeds: Vec<(&str, Vec<Payload>, ArchiveOptions)> = vec![
        ("seed_empty.zip", Vec::new(), fixed.clone()),
        (
            "seed_single_small.zip",
            vec![Payload::new("test.txt", b"Hello, World!".to_vec())],
            fixed.clone(),
        ),
        (
            "seed_multi.zip",
            vec![
                Payload::new("file1.txt", b"First file".to_vec()),
                Payload::directory("dir"),
                Payload::new("dir/file3.txt", b"Third file in directory".to_vec()),
            ],
            fixed.clone(),
        ),
        (
            "seed_deflated.zip",
            vec![Payload::new("large.txt", b"compressible line\n".repeat(4096))],
            ArchiveOptions { level: 9, ..fixed.clone() },
        ),
        (
            "seed_aes.zip",
            vec![Payload::new("secret.txt", b"top secret".to_vec())],
            ArchiveOptions {
                password: Some("fuzz".to_string()),
                ..fixed.clone()
            },
        ),
        (
            "seed_zipcrypto.zip",
            vec![Payload::new("legacy.txt", b"legacy secret".to_vec())],
            ArchiveOptions {
                password: Some("fuzz".to_string()),
                legacy_encryption: true,
                ..fixed.clone()
            },
        ),
        (
            "seed_comment.zip",
            vec![Payload::new("a.txt", b"a".to_vec())],
            ArchiveOptions {
                comment: Some("seed archive".to_string()),
                ..fixed
            },
        ),
    ];

    for (name, payloads, options) in seeds {
        let path = format!("{}/{}", corpus_dir, name);
        fs::write(&path, compress(&payloads, &options)?)?;
        println!("✓ Generated: {}", path);
    }

    Ok(())
}
