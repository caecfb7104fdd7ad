//! Region classification checked through the public board surface: the
//! silhouette, edge, and trunk flags tiles end up with after a rebuild.

use flapboard::{Board, BoardConfig, MaskImage};

fn board(width: u32, height: u32) -> Board {
    let cfg = BoardConfig {
        tile_size_px: 10,
        ..BoardConfig::default()
    };
    let mut board = Board::new(cfg).unwrap();
    board.resize(width, height, None);
    board
}

#[test]
fn procedural_silhouette_populates_all_three_regions() {
    let board = board(720, 680);
    let tiles = board.tiles();
    assert!(tiles.iter().any(|t| t.in_silhouette));
    assert!(tiles.iter().any(|t| t.is_edge));
    assert!(tiles.iter().any(|t| t.is_trunk));
    // The field stays clear of silhouette flags.
    assert!(tiles.iter().any(|t| !t.in_silhouette));
}

#[test]
fn tile_flags_respect_region_invariants() {
    let board = board(640, 700);
    let (cols, rows) = (board.cols(), board.rows());
    for r in 0..rows {
        for c in 0..cols {
            let t = board.tile(r, c);
            if t.is_trunk {
                assert!(t.in_silhouette, "trunk outside silhouette at ({r}, {c})");
            }
            if t.is_edge {
                assert!(t.in_silhouette, "edge outside silhouette at ({r}, {c})");
                let mut exposed = false;
                for (dr, dc) in [
                    (-1i64, -1i64),
                    (-1, 0),
                    (-1, 1),
                    (0, -1),
                    (0, 1),
                    (1, -1),
                    (1, 0),
                    (1, 1),
                ] {
                    let nr = r as i64 + dr;
                    let nc = c as i64 + dc;
                    if nr < 0 || nc < 0 || nr >= rows as i64 || nc >= cols as i64 {
                        exposed = true;
                    } else if !board.tile(nr as usize, nc as usize).in_silhouette {
                        exposed = true;
                    }
                }
                assert!(exposed, "interior tile flagged as edge at ({r}, {c})");
            }
        }
    }
}

#[test]
fn same_grid_always_classifies_identically() {
    let a = board(500, 460);
    let b = board(500, 460);
    for (ta, tb) in a.tiles().iter().zip(b.tiles()) {
        assert_eq!(ta.in_silhouette, tb.in_silhouette);
        assert_eq!(ta.is_edge, tb.is_edge);
        assert_eq!(ta.is_trunk, tb.is_trunk);
    }
}

#[test]
fn mask_image_overrides_procedural_silhouette() {
    let mut board = board(400, 400);
    assert!(board.tiles().iter().any(|t| t.is_trunk));

    // A solid opaque square: everything it covers is interior, no trunk.
    let img = MaskImage::from_rgba(8, 8, vec![60u8; 8 * 8 * 4]).unwrap();
    board.rebuild_mask(Some(&img));
    assert!(board.tiles().iter().any(|t| t.in_silhouette));
    assert!(!board.tiles().iter().any(|t| t.is_trunk));

    // Dropping the image brings the tree back.
    board.rebuild_mask(None);
    assert!(board.tiles().iter().any(|t| t.is_trunk));
}

#[test]
fn degenerate_viewport_has_no_silhouette() {
    let board = board(0, 0);
    assert_eq!(board.tiles().len(), 0);
}
