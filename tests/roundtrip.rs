// tests/roundtrip.rs

//! Pack/unpack round trips through real files on disk.

mod common;

use common::{fixture, fixture_with, list_files};
use sealpack::{
    inspect, pack, unpack, unpack_pinned, ErrorKind, FingerprintSet, HashAlgorithm, PackOptions,
    PinnedFingerprint, SignerIdentity, SourceSet, TrustConfig, UnpackOptions,
};
use std::fs;

#[test]
fn test_pack_and_unpack_directory() {
    let fx = fixture();
    let archive = fx.path("out.sealed");
    let sources = SourceSet::from_dir(&fx.source).unwrap();

    let report = pack(
        &sources,
        &archive,
        &fx.cert_path,
        &fx.key_path,
        &PackOptions::default(),
    )
    .unwrap();
    assert_eq!(report.files, 2);
    assert_eq!(report.fingerprint.to_hex(), fx.pin());

    let dest = fx.path("dest");
    let unpacked = unpack_pinned(&archive, &fx.pin(), &dest).unwrap();

    assert_eq!(unpacked.signer, "CN=integration signer");
    assert_eq!(list_files(&dest), vec!["a.txt", "sub/b.txt"]);
    assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"hello");
    assert_eq!(fs::read(dest.join("sub/b.txt")).unwrap(), b"world");
}

#[test]
fn test_sha512_roundtrip() {
    let fx = fixture();
    let archive = fx.path("out.sealed");
    let sources = SourceSet::from_dir(&fx.source).unwrap();
    let options = PackOptions {
        algorithm: HashAlgorithm::Sha512,
    };
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &options).unwrap();

    // Fingerprint algorithm is independent of the content digest algorithm
    let pin = PinnedFingerprint::new(fx.identity.fingerprint(HashAlgorithm::Sha512));
    let inspection = inspect(&archive, &pin).unwrap();
    assert_eq!(inspection.manifest.algorithm, HashAlgorithm::Sha512);
    assert_eq!(inspection.manifest.payload_digest.len(), 128);

    let dest = fx.path("dest");
    unpack(&archive, &pin, &dest, &UnpackOptions::default()).unwrap();
    assert_eq!(fs::read(dest.join("sub/b.txt")).unwrap(), b"world");
}

#[test]
fn test_binary_empty_and_nested_files() {
    let binary: Vec<u8> = (0..=255u8).cycle().take(70_000).collect();
    let fx = fixture_with(&[
        ("empty", b""),
        ("bin/data.bin", &binary),
        ("deep/er/and/deeper/leaf.txt", b"leaf"),
        ("unicode/naïve café.txt", b"utf8 name"),
    ]);
    let archive = fx.path("out.sealed");
    let sources = SourceSet::from_dir(&fx.source).unwrap();
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &PackOptions::default()).unwrap();

    let dest = fx.path("dest");
    unpack_pinned(&archive, &fx.pin(), &dest).unwrap();

    assert_eq!(fs::read(dest.join("empty")).unwrap(), b"");
    assert_eq!(fs::read(dest.join("bin/data.bin")).unwrap(), binary);
    assert_eq!(fs::read(dest.join("deep/er/and/deeper/leaf.txt")).unwrap(), b"leaf");
    assert_eq!(fs::read(dest.join("unicode/naïve café.txt")).unwrap(), b"utf8 name");
}

#[test]
fn test_unpack_twice_is_idempotent() {
    let fx = fixture();
    let archive = fx.path("out.sealed");
    let sources = SourceSet::from_dir(&fx.source).unwrap();
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &PackOptions::default()).unwrap();

    let dest = fx.path("dest");
    unpack_pinned(&archive, &fx.pin(), &dest).unwrap();
    unpack_pinned(&archive, &fx.pin(), &dest).unwrap();

    assert_eq!(list_files(&dest), vec!["a.txt", "sub/b.txt"]);
    assert_eq!(fs::read(dest.join("a.txt")).unwrap(), b"hello");
}

#[test]
fn test_no_overwrite_preserves_existing_tree() {
    let fx = fixture();
    let archive = fx.path("out.sealed");
    let sources = SourceSet::from_dir(&fx.source).unwrap();
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &PackOptions::default()).unwrap();

    let dest = fx.path("dest");
    fs::create_dir_all(dest.join("sub")).unwrap();
    fs::write(dest.join("sub/b.txt"), b"local edit").unwrap();

    let pin = PinnedFingerprint::parse(&fx.pin()).unwrap();
    let err = unpack(&archive, &pin, &dest, &UnpackOptions { overwrite: false }).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Io);
    assert_eq!(list_files(&dest), vec!["sub/b.txt"]);
    assert_eq!(fs::read(dest.join("sub/b.txt")).unwrap(), b"local edit");
}

#[test]
fn test_trust_file_with_several_signers() {
    let fx = fixture();
    let archive = fx.path("out.sealed");
    let sources = SourceSet::from_dir(&fx.source).unwrap();
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &PackOptions::default()).unwrap();

    let other = SignerIdentity::generate("someone else", 1).unwrap();
    let trust_path = fx.path("trust.toml");
    fs::write(
        &trust_path,
        format!(
            "fingerprints = [\n  \"{}\",\n  \"{}\",\n]\n",
            other.fingerprint(HashAlgorithm::Sha256).to_prefixed_string(),
            fx.identity.fingerprint(HashAlgorithm::Sha512).to_prefixed_string(),
        ),
    )
    .unwrap();

    let policy = TrustConfig::from_file(&trust_path).unwrap().policy();
    let dest = fx.path("dest");
    unpack(&archive, &policy, &dest, &UnpackOptions::default()).unwrap();
    assert_eq!(list_files(&dest), vec!["a.txt", "sub/b.txt"]);

    let strangers = FingerprintSet::new(vec![other.fingerprint(HashAlgorithm::Sha256)]);
    let err = inspect(&archive, &strangers).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::CertificateNotTrusted);
}

#[test]
fn test_openssl_style_fingerprint() {
    let fx = fixture();
    let archive = fx.path("out.sealed");
    let sources = SourceSet::from_dir(&fx.source).unwrap();
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &PackOptions::default()).unwrap();

    let colon_form = fx
        .identity
        .fingerprint(HashAlgorithm::Sha256)
        .as_bytes()
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(":");

    let dest = fx.path("dest");
    unpack_pinned(&archive, &colon_form, &dest).unwrap();
    assert_eq!(list_files(&dest), vec!["a.txt", "sub/b.txt"]);
}

#[test]
fn test_inspect_writes_nothing() {
    let fx = fixture();
    let archive = fx.path("out.sealed");
    let sources = SourceSet::from_dir(&fx.source).unwrap();
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &PackOptions::default()).unwrap();

    let before = list_files(fx.dir.path());
    let inspection = inspect(&archive, &PinnedFingerprint::parse(&fx.pin()).unwrap()).unwrap();
    assert_eq!(list_files(fx.dir.path()), before);

    let record = inspection.manifest.get("sub/b.txt").unwrap();
    assert_eq!(record.name, "b.txt");
    assert_eq!(record.size, 5);
    assert_eq!(inspection.manifest.total_size(), 10);
}

#[test]
fn test_explicit_file_list() {
    let fx = fixture_with(&[("keep.txt", b"kept"), ("skip.txt", b"skipped")]);
    let archive = fx.path("out.sealed");
    let sources = SourceSet::new(&fx.source, vec!["keep.txt".into()]).unwrap();
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &PackOptions::default()).unwrap();

    let dest = fx.path("dest");
    unpack_pinned(&archive, &fx.pin(), &dest).unwrap();
    assert_eq!(list_files(&dest), vec!["keep.txt"]);
}

#[test]
fn test_empty_directory_is_rejected() {
    let fx = fixture_with(&[]);
    let err = SourceSet::from_dir(&fx.source).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
}

#[test]
fn test_pack_replaces_existing_archive() {
    let fx = fixture();
    let archive = fx.path("out.sealed");
    fs::write(&archive, b"stale").unwrap();

    let sources = SourceSet::from_dir(&fx.source).unwrap();
    pack(&sources, &archive, &fx.cert_path, &fx.key_path, &PackOptions::default()).unwrap();

    let dest = fx.path("dest");
    unpack_pinned(&archive, &fx.pin(), &dest).unwrap();
    assert_eq!(list_files(&dest), vec!["a.txt", "sub/b.txt"]);
}
