use album_viewer::album::{Album, AlbumSource};
use proptest::prelude::*;
use serde_yaml::Value;

/// Album whose entries are present where `mask` is true; at least one is.
fn album_from_mask(mask: &[bool]) -> Album {
    let images = mask
        .iter()
        .enumerate()
        .map(|(i, present)| {
            if *present {
                Value::String(format!("{i}.jpg"))
            } else {
                Value::Null
            }
        })
        .collect();
    let source = AlbumSource::new("p", Vec::<String>::new()).with_images(Value::Sequence(images));
    Album::from_source(&source).unwrap()
}

fn mask() -> impl Strategy<Value = Vec<bool>> {
    prop::collection::vec(any::<bool>(), 1..24).prop_filter("needs a present entry", |m| {
        m.iter().any(|p| *p)
    })
}

proptest! {
    #[test]
    fn safe_index_lands_on_a_present_entry(mask in mask(), idx in -100i64..100, endless: bool) {
        let album = album_from_mask(&mask);
        let got = album.safe_index(idx, endless);
        prop_assert!(got < album.len());
        prop_assert!(album.entry(got).is_some());
    }

    #[test]
    fn safe_index_is_identity_on_present_entries(mask in mask(), endless: bool) {
        let album = album_from_mask(&mask);
        for (i, present) in mask.iter().enumerate() {
            if *present {
                prop_assert_eq!(album.safe_index(i as i64, endless), i);
            }
        }
    }

    #[test]
    fn dense_albums_wrap_or_clamp(len in 1usize..30, over in 0i64..50) {
        let album = album_from_mask(&vec![true; len]);
        let len = len as i64;
        prop_assert_eq!(album.safe_index(len + over, true), 0);
        prop_assert_eq!(album.safe_index(-1 - over, true), (len - 1) as usize);
        prop_assert_eq!(album.safe_index(len + over, false), (len - 1) as usize);
        prop_assert_eq!(album.safe_index(-1 - over, false), 0);
    }
}
