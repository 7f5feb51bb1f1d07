use album_viewer::album::Album;
use album_viewer::scan::{ScanOptions, scan_album};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

#[test]
fn scan_lists_images_sorted_and_relative() {
    let tmp = tempdir().unwrap();
    let lib = tmp.path().join("holiday");
    fs::create_dir_all(lib.join("day2")).unwrap();
    fs::create_dir_all(lib.join(".thumbs")).unwrap();

    fs::write(lib.join("b.jpg"), b"x").unwrap();
    fs::write(lib.join("a.PNG"), b"x").unwrap();
    fs::write(lib.join("day2").join("c.jpeg"), b"x").unwrap();
    fs::write(lib.join("notes.txt"), b"x").unwrap();
    fs::write(lib.join(".thumbs").join("hidden.jpg"), b"x").unwrap();

    let source = scan_album(&lib, &ScanOptions::default()).unwrap();
    let album = Album::from_source(&source).unwrap();
    assert_eq!(album.name(), "holiday");

    let names: Vec<&str> = (0..album.len())
        .filter_map(|i| album.image_name(i))
        .collect();
    assert_eq!(names, ["a.PNG", "b.jpg", "day2/c.jpeg"]);

    let url = album.source_url(2).unwrap();
    assert!(url.ends_with("holiday/day2/c.jpeg"), "{url}");
    assert!(album.base_location().unwrap().ends_with('/'));
}

#[test]
fn non_recursive_scan_stays_at_top() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join("sub")).unwrap();
    fs::write(tmp.path().join("top.gif"), b"x").unwrap();
    fs::write(tmp.path().join("sub").join("deep.webp"), b"x").unwrap();

    let opts = ScanOptions {
        recursive: false,
        ..ScanOptions::default()
    };
    let album = Album::from_source(&scan_album(tmp.path(), &opts).unwrap()).unwrap();
    assert_eq!(album.len(), 1);
    assert_eq!(album.image_name(0), Some("top.gif"));
}

#[test]
fn empty_or_missing_directories_fail() {
    let tmp = tempdir().unwrap();
    fs::write(tmp.path().join("readme.md"), b"x").unwrap();
    assert!(scan_album(tmp.path(), &ScanOptions::default()).is_err());
    assert!(scan_album(&tmp.path().join("nope"), &ScanOptions::default()).is_err());
}

#[test]
fn hidden_directories_can_be_included() {
    let tmp = tempdir().unwrap();
    fs::create_dir_all(tmp.path().join(".drafts")).unwrap();
    fs::write(tmp.path().join(".drafts").join("wip.jpg"), b"x").unwrap();
    assert!(scan_album(tmp.path(), &ScanOptions::default()).is_err());

    let opts = ScanOptions {
        include_hidden: true,
        ..ScanOptions::default()
    };
    let album = Album::from_source(&scan_album(tmp.path(), &opts).unwrap()).unwrap();
    assert_eq!(album.image_name(0), Some(".drafts/wip.jpg"));
}

#[test]
fn extension_filter_is_case_insensitive_and_overridable() {
    let opts = ScanOptions::default();
    assert!(opts.accepts(Path::new("x/IMG_1.JPG")));
    assert!(!opts.accepts(Path::new("x/clip.mov")));
    assert!(!opts.accepts(Path::new("noext")));

    let tiff = ScanOptions {
        extensions: vec!["tif".into()],
        ..ScanOptions::default()
    };
    assert!(tiff.accepts(Path::new("raw.TIF")));
    assert!(!tiff.accepts(Path::new("a.jpg")));
}
