//! End-to-end grid scenarios driven through the public document API.

use trellis_core::{Coord, Document, GridBounds, Settings, Value, Viewport};

fn sheet(rows: usize, cols: usize, tables: usize) -> Document {
    let settings = Settings {
        rows,
        cols,
        tables,
        ..Settings::default()
    };
    Document::with_settings(&settings)
}

#[test]
fn edit_propagates_to_a_referencing_cell_on_next_pull() {
    let mut doc = sheet(200, 10, 5);

    doc.set_expression(Coord::new(0, 0, 0), "1 + 5*2").unwrap();
    doc.set_expression(Coord::new(1, 0, 0), "S[0, 0, 0]").unwrap();
    assert_eq!(doc.display(Coord::new(0, 0, 0)), "11");
    assert_eq!(doc.display(Coord::new(1, 0, 0)), "11");

    // Changing the referent updates the referencing cell on its next pull
    // without touching that cell's own text.
    doc.set_expression(Coord::new(0, 0, 0), "1").unwrap();
    assert_eq!(doc.expression(Coord::new(1, 0, 0)), "S[0, 0, 0]");
    assert_eq!(doc.display(Coord::new(1, 0, 0)), "1");
}

#[test]
fn relative_references_survive_paste_at_an_offset() {
    let mut doc = sheet(200, 10, 5);
    doc.set_viewport(Viewport::full_table(2));

    doc.set_expression(Coord::new(1, 1, 2), "0").unwrap();
    doc.set_expression(Coord::new(2, 1, 2), "S[X-1, Y, Z] + 1")
        .unwrap();
    assert_eq!(doc.display(Coord::new(2, 1, 2)), "1");

    let copied = doc.expression(Coord::new(2, 1, 2));
    doc.paste_cells(Coord::new(3, 1, 2), &[(0, 0, copied)])
        .unwrap();
    assert_eq!(doc.display(Coord::new(3, 1, 2)), "2");
}

#[test]
fn named_bindings_span_tables_and_follow_the_last_writer() {
    let mut doc = sheet(200, 10, 5);

    doc.set_expression(Coord::new(2, 4, 2), "a = 15").unwrap();
    assert_eq!(doc.display(Coord::new(2, 4, 2)), "15");

    doc.set_expression(Coord::new(3, 4, 2), "a").unwrap();
    doc.set_expression(Coord::new(0, 0, 4), "a + 5").unwrap();
    assert_eq!(doc.display(Coord::new(3, 4, 2)), "15");
    assert_eq!(doc.display(Coord::new(0, 0, 4)), "20");

    // A later redefinition anywhere overwrites the value seen everywhere.
    doc.set_expression(Coord::new(0, 0, 1), "a = 40").unwrap();
    assert_eq!(doc.display(Coord::new(0, 0, 1)), "40");
    doc.set_viewport(Viewport::full_table(4));
    assert_eq!(doc.display(Coord::new(0, 0, 4)), "45");
}

#[test]
fn cycles_fail_every_coordinate_and_recover_after_an_edit() {
    let mut doc = sheet(200, 10, 5);

    doc.set_expression(Coord::new(0, 0, 0), "S[1, 0, 0] + 1").unwrap();
    doc.set_expression(Coord::new(1, 0, 0), "S[2, 0, 0] + 1").unwrap();
    doc.set_expression(Coord::new(2, 0, 0), "S[0, 0, 0] + 1").unwrap();

    for row in 0..3 {
        assert_eq!(doc.display(Coord::new(row, 0, 0)), "#CYCLE!");
    }

    // The failure is not permanent: breaking the chain re-evaluates.
    doc.set_expression(Coord::new(2, 0, 0), "0").unwrap();
    assert_eq!(doc.display(Coord::new(2, 0, 0)), "0");
    assert_eq!(doc.display(Coord::new(1, 0, 0)), "1");
    assert_eq!(doc.display(Coord::new(0, 0, 0)), "2");
}

#[test]
fn magic_values_reflect_the_evaluating_coordinate() {
    let mut doc = sheet(200, 10, 5);

    doc.set_expression(Coord::new(4, 2, 1), "X * 100 + Y * 10 + Z")
        .unwrap();
    assert_eq!(doc.display(Coord::new(4, 2, 1)), "421");

    // The same text one row down reflects the new position.
    let text = doc.expression(Coord::new(4, 2, 1));
    doc.set_viewport(Viewport::full_table(1));
    doc.paste_cells(Coord::new(5, 2, 1), &[(0, 0, text)]).unwrap();
    assert_eq!(doc.display(Coord::new(5, 2, 1)), "521");
}

#[test]
fn range_slices_resolve_row_major_with_clamped_length() {
    let mut doc = sheet(200, 10, 5);

    for row in 0..3 {
        doc.set_expression(Coord::new(row, 0, 0), &format!("{}", row + 1))
            .unwrap();
    }

    // Row-major sequence over a clamped slice: rows 0..200 clamp to the
    // grid's bound, trailing empties included.
    doc.set_expression(Coord::new(0, 5, 0), "S[0:3, 0, 0]").unwrap();
    assert_eq!(
        doc.evaluate(Coord::new(0, 5, 0)),
        Value::Seq(vec![Value::Int(1), Value::Int(2), Value::Int(3)])
    );

    doc.set_expression(Coord::new(1, 5, 0), "S[0:1000, 0, 0].len()")
        .unwrap();
    assert_eq!(doc.display(Coord::new(1, 5, 0)), "200");

    doc.set_expression(Coord::new(2, 5, 0), "SUM(S[0:3, 0, 0])")
        .unwrap();
    assert_eq!(doc.display(Coord::new(2, 5, 0)), "6");
}

#[test]
fn undo_reverts_a_bulk_paste_as_one_operation() {
    let mut doc = sheet(200, 10, 5);

    doc.set_expression(Coord::new(0, 0, 0), "\"old\"").unwrap();
    let cells: Vec<(usize, usize, String)> = (0..4)
        .map(|i| (i, 0usize, format!("{}", i * 10)))
        .collect();
    doc.paste_cells(Coord::new(0, 0, 0), &cells).unwrap();
    assert_eq!(doc.display(Coord::new(3, 0, 0)), "30");

    doc.undo().unwrap();
    assert_eq!(doc.display(Coord::new(0, 0, 0)), "old");
    for row in 1..4 {
        assert_eq!(doc.expression(Coord::new(row, 0, 0)), "");
        assert!(doc.cached_value(Coord::new(row, 0, 0)).is_none());
    }

    doc.redo().unwrap();
    for row in 0..4 {
        assert_eq!(doc.display(Coord::new(row, 0, 0)), format!("{}", row * 10));
    }
}

#[test]
fn resize_drops_out_of_bounds_cells_recoverably() {
    let mut doc = sheet(200, 10, 5);

    doc.set_expression(Coord::new(150, 5, 4), "\"far\"").unwrap();
    doc.resize(GridBounds::new(100, 10, 2)).unwrap();
    assert_eq!(doc.expression(Coord::new(150, 5, 4)), "");

    doc.undo().unwrap();
    assert_eq!(doc.bounds(), GridBounds::new(200, 10, 5));
    assert_eq!(doc.display(Coord::new(150, 5, 4)), "far");
}

#[test]
fn error_cells_render_markers_and_chain() {
    let mut doc = sheet(200, 10, 5);

    doc.set_expression(Coord::new(0, 0, 0), "S[5000, 0, 0]").unwrap();
    assert_eq!(doc.display(Coord::new(0, 0, 0)), "#REF!");

    doc.set_expression(Coord::new(1, 0, 0), "S[0, 0, 0] + 1").unwrap();
    assert_eq!(doc.display(Coord::new(1, 0, 0)), "#REF!");

    doc.set_expression(Coord::new(2, 0, 0), "whatever").unwrap();
    assert_eq!(doc.display(Coord::new(2, 0, 0)), "#NAME!");

    // The cause stays inspectable behind the marker.
    match doc.evaluate(Coord::new(2, 0, 0)) {
        Value::Error(err) => assert!(err.to_string().contains("whatever")),
        other => panic!("expected error, got {:?}", other),
    }
}
