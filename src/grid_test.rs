use super::*;

fn write(x: i64, y: i64, color: &str) -> CellWrite {
    CellWrite { x, y, color: Some(color.into()) }
}

#[test]
fn set_and_get() {
    let mut grid = Grid::new(10, 10);
    assert!(grid.set(3, 4, Some("#ff0000".into())));
    assert_eq!(grid.get(3, 4), Some("#ff0000"));
    assert_eq!(grid.get(4, 3), None);
}

#[test]
fn last_write_wins() {
    let mut grid = Grid::new(10, 10);
    assert!(grid.set(2, 2, Some("#111111".into())));
    assert!(grid.set(2, 2, Some("#222222".into())));
    assert_eq!(grid.get(2, 2), Some("#222222"));
}

#[test]
fn clear_removes_cell() {
    let mut grid = Grid::new(10, 10);
    grid.set(5, 5, Some("#abc".into()));
    assert!(grid.set(5, 5, None));
    assert_eq!(grid.get(5, 5), None);
    assert_eq!(grid.set_cells(), 0);
}

#[test]
fn out_of_range_set_leaves_grid_unchanged() {
    let mut grid = Grid::new(10, 10);
    assert!(!grid.set(10, 0, Some("#fff".into())));
    assert!(!grid.set(0, 10, Some("#fff".into())));
    assert!(!grid.set(-1, 0, Some("#fff".into())));
    assert!(!grid.set(0, -1, Some("#fff".into())));
    assert_eq!(grid.set_cells(), 0);
}

#[test]
fn out_of_range_get_is_none() {
    let grid = Grid::new(10, 10);
    assert_eq!(grid.get(-1, 0), None);
    assert_eq!(grid.get(0, 10), None);
}

#[test]
fn batch_applies_in_order() {
    let mut grid = Grid::new(10, 10);
    let applied = grid
        .apply_batch(
            vec![write(1, 1, "#111"), write(1, 1, "#222"), write(2, 2, "#333")],
            10,
        )
        .expect("batch within limit");
    assert_eq!(applied.len(), 3);
    assert_eq!(grid.get(1, 1), Some("#222"));
    assert_eq!(grid.get(2, 2), Some("#333"));
}

#[test]
fn oversize_batch_rejected_in_full() {
    let mut grid = Grid::new(10, 10);
    let writes: Vec<CellWrite> = (0..5).map(|i| write(i, 0, "#fff")).collect();
    let err = grid.apply_batch(writes, 4).expect_err("batch over limit");
    assert!(matches!(err, GridError::BatchTooLarge { max: 4, got: 5 }));
    // Zero pairs applied.
    assert_eq!(grid.set_cells(), 0);
}

#[test]
fn batch_drops_out_of_range_pairs_individually() {
    let mut grid = Grid::new(10, 10);
    let applied = grid
        .apply_batch(vec![write(1, 1, "#111"), write(99, 99, "#222"), write(2, 2, "#333")], 10)
        .expect("batch within limit");
    assert_eq!(applied.len(), 2);
    assert_eq!(grid.get(1, 1), Some("#111"));
    assert_eq!(grid.get(2, 2), Some("#333"));
    assert_eq!(grid.get(9, 9), None);
}

#[test]
fn snapshot_matches_current_contents() {
    let mut grid = Grid::new(10, 10);
    grid.set(0, 0, Some("#a".into()));
    grid.set(9, 9, Some("#b".into()));
    grid.set(4, 4, Some("#c".into()));
    grid.set(4, 4, None); // cleared cells are absent

    let snapshot = grid.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert!(snapshot.contains(&write(0, 0, "#a")));
    assert!(snapshot.contains(&write(9, 9, "#b")));
}

#[test]
fn empty_grid_snapshot_is_empty() {
    let grid = Grid::new(10, 10);
    assert!(grid.snapshot().is_empty());
}

#[test]
fn cell_key_round_trip() {
    assert_eq!(cell_key(3, 7), "3,7");
    assert_eq!(parse_cell_key("3,7"), Some((3, 7)));
    assert_eq!(parse_cell_key(" 3 , 7 "), Some((3, 7)));
    assert_eq!(parse_cell_key("3;7"), None);
    assert_eq!(parse_cell_key("3,seven"), None);
    assert_eq!(parse_cell_key(""), None);
}
