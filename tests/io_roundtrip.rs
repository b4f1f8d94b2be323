// On-disk layout: save, reload, and keep answering identically.

mod common;

use common::{build_index, NaiveReference};
use fmdmap::{FmdError, FmdIndex};
use std::fs;

fn two_genome_contigs() -> Vec<(&'static str, usize, &'static [u8])> {
    vec![
        ("chr1", 0, b"AATCTACTGC"),
        ("chr2", 0, b"GATTACA"),
        ("alt1", 1, b"CCGGTTAACC"),
    ]
}

#[test]
fn save_and_load_round_trip() {
    let contigs = two_genome_contigs();
    let index = build_index(&contigs, 4);
    let naive = NaiveReference::new(&contigs);

    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("ref");
    index.save(&basename).unwrap();

    for ext in [".bwt", ".ssa", ".lcp", ".contigs", ".msk", ".chrom.sizes"] {
        let mut piece = basename.as_os_str().to_os_string();
        piece.push(ext);
        assert!(
            fs::metadata(&piece).is_ok(),
            "missing index piece {ext}"
        );
    }

    let restored = FmdIndex::load(&basename).unwrap();

    assert_eq!(restored.bwt_length(), index.bwt_length());
    assert_eq!(restored.num_contigs(), 3);
    assert_eq!(restored.num_genomes(), 2);
    assert_eq!(restored.genome_contigs(0).unwrap(), (0, 2));
    assert_eq!(restored.genome_contigs(1).unwrap(), (2, 3));
    for (i, &(name, genome, seq)) in contigs.iter().enumerate() {
        assert_eq!(restored.contig_name(i).unwrap(), name);
        assert_eq!(restored.contig_genome(i).unwrap(), genome);
        assert_eq!(restored.contig_length(i).unwrap(), seq.len());
        assert_eq!(restored.display_contig(i).unwrap(), seq.to_vec());
    }

    // Query behaviour is unchanged.
    for pattern in [&b"GATT"[..], b"TAC", b"CCGG", b"AAAA"] {
        assert_eq!(
            restored.count(pattern).unwrap().length() as usize,
            naive.occurrences(pattern).len()
        );
    }
    let query = b"GATTACA";
    assert_eq!(
        restored.map_right(query, None, 2).unwrap(),
        index.map_right(query, None, 2).unwrap()
    );
    assert_eq!(
        restored
            .map_right_genome(query, Some(1), 2)
            .unwrap(),
        index.map_right_genome(query, Some(1), 2).unwrap()
    );
}

#[test]
fn chrom_sizes_lists_every_contig() {
    let index = build_index(&two_genome_contigs(), 4);
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("ref");
    index.save(&basename).unwrap();

    let mut piece = basename.as_os_str().to_os_string();
    piece.push(".chrom.sizes");
    let listing = fs::read_to_string(&piece).unwrap();
    let lines: Vec<&str> = listing.lines().collect();
    assert_eq!(lines, vec!["chr1\t10", "chr2\t7", "alt1\t10"]);
}

#[test]
fn missing_mask_file_fails_to_load() {
    let index = build_index(&two_genome_contigs(), 4);
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("ref");
    index.save(&basename).unwrap();

    let mut piece = basename.as_os_str().to_os_string();
    piece.push(".msk");
    fs::remove_file(&piece).unwrap();
    assert!(matches!(FmdIndex::load(&basename), Err(FmdError::Io(_))));
}

#[test]
fn contig_referencing_unmasked_genome_is_inconsistent() {
    let index = build_index(&two_genome_contigs(), 4);
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("ref");
    index.save(&basename).unwrap();

    // Rewrite the contig table so alt1 claims a genome with no mask.
    let mut piece = basename.as_os_str().to_os_string();
    piece.push(".contigs");
    let table = fs::read_to_string(&piece).unwrap();
    fs::write(&piece, table.replace("alt1\t0\t10\t1", "alt1\t0\t10\t7")).unwrap();

    assert!(matches!(
        FmdIndex::load(&basename),
        Err(FmdError::InconsistentIndex(_))
    ));
}

#[test]
fn truncated_lcp_is_inconsistent() {
    let index = build_index(&two_genome_contigs(), 4);
    let dir = tempfile::tempdir().unwrap();
    let basename = dir.path().join("ref");
    index.save(&basename).unwrap();

    let mut piece = basename.as_os_str().to_os_string();
    piece.push(".lcp");
    let bytes = fs::read(&piece).unwrap();
    fs::write(&piece, &bytes[..bytes.len() - 16]).unwrap();
    assert!(matches!(
        FmdIndex::load(&basename),
        Err(FmdError::InconsistentIndex(_))
    ));
}
