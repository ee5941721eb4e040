//! Result-set behavior against hand-written stub cursors.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use pretty_assertions::assert_eq;
use rowbridge::prelude::*;
use rowbridge::types::code;
use rust_decimal::Decimal;
use std::cell::Cell;
use std::rc::Rc;
use std::str::FromStr;

/// Cell contents for the stub driver.
#[derive(Debug, Clone)]
enum StubCell {
    Null,
    Int(i32),
    Float(f32),
    Decimal(&'static str),
    Text(&'static str),
}

#[derive(Default)]
struct Calls {
    fetches: Cell<usize>,
    int_reads: Cell<usize>,
    closes: Cell<usize>,
}

struct StubCursor {
    columns: Vec<(&'static str, i32)>,
    rows: Vec<Vec<StubCell>>,
    next: usize,
    fail_fetch_at: Option<usize>,
    fail_close: bool,
    calls: Rc<Calls>,
}

impl StubCursor {
    fn new(columns: Vec<(&'static str, i32)>, rows: Vec<Vec<StubCell>>) -> Self {
        Self {
            columns,
            rows,
            next: 0,
            fail_fetch_at: None,
            fail_close: false,
            calls: Rc::new(Calls::default()),
        }
    }

    fn catalog(&self) -> ColumnCatalog {
        ColumnCatalog::build(&self.metadata().unwrap()).unwrap()
    }
}

struct StubMetadata(Vec<(&'static str, i32)>);

impl CursorMetadata for StubMetadata {
    fn column_count(&self) -> DriverResult<usize> {
        Ok(self.0.len())
    }

    fn column_label(&self, position: usize) -> DriverResult<String> {
        Ok(self.0[position - 1].0.to_string())
    }

    fn column_name(&self, position: usize) -> DriverResult<String> {
        Ok(self.0[position - 1].0.to_lowercase())
    }

    fn column_type(&self, position: usize) -> DriverResult<i32> {
        Ok(self.0[position - 1].1)
    }

    fn column_display_size(&self, _position: usize) -> DriverResult<u32> {
        Ok(12)
    }
}

struct StubRow {
    cells: Vec<StubCell>,
    calls: Rc<Calls>,
}

impl StubRow {
    fn cell(&self, position: usize) -> &StubCell {
        &self.cells[position - 1]
    }

    fn unexpected(&self, position: usize, accessor: &str) -> DriverError {
        format!("{} called on {:?}", accessor, self.cell(position)).into()
    }
}

impl RowHandle for StubRow {
    fn read_raw(&self, position: usize) -> DriverResult<Value> {
        Ok(match self.cell(position) {
            StubCell::Null => Value::Null,
            StubCell::Int(v) => Value::Int(*v),
            StubCell::Float(v) => Value::Double(f64::from(*v)),
            StubCell::Decimal(s) => Value::Decimal(Decimal::from_str(s)?),
            StubCell::Text(s) => Value::Text(s.to_string()),
        })
    }

    fn read_short(&self, position: usize) -> DriverResult<i16> {
        Err(self.unexpected(position, "read_short"))
    }

    fn read_int(&self, position: usize) -> DriverResult<i32> {
        self.calls.int_reads.set(self.calls.int_reads.get() + 1);
        match self.cell(position) {
            StubCell::Int(v) => Ok(*v),
            _ => Err(self.unexpected(position, "read_int")),
        }
    }

    fn read_float(&self, position: usize) -> DriverResult<f32> {
        match self.cell(position) {
            StubCell::Float(v) => Ok(*v),
            _ => Err(self.unexpected(position, "read_float")),
        }
    }

    fn read_double(&self, position: usize) -> DriverResult<f64> {
        Err(self.unexpected(position, "read_double"))
    }

    fn read_boolean(&self, position: usize) -> DriverResult<bool> {
        Err(self.unexpected(position, "read_boolean"))
    }

    fn read_string(&self, position: usize) -> DriverResult<Option<String>> {
        match self.cell(position) {
            StubCell::Null => Ok(None),
            StubCell::Text(s) => Ok(Some(format!("str:{}", s))),
            _ => Err(self.unexpected(position, "read_string")),
        }
    }

    fn read_big_decimal(&self, position: usize) -> DriverResult<Option<Decimal>> {
        match self.cell(position) {
            StubCell::Null => Ok(None),
            StubCell::Decimal(s) => Ok(Some(Decimal::from_str(s)?)),
            _ => Err(self.unexpected(position, "read_big_decimal")),
        }
    }

    fn read_date(&self, position: usize) -> DriverResult<Option<NaiveDate>> {
        Err(self.unexpected(position, "read_date"))
    }

    fn read_time(&self, position: usize) -> DriverResult<Option<NaiveTime>> {
        Err(self.unexpected(position, "read_time"))
    }

    fn read_timestamp(&self, position: usize) -> DriverResult<Option<NaiveDateTime>> {
        Err(self.unexpected(position, "read_timestamp"))
    }

    fn read_bytes(&self, position: usize) -> DriverResult<Option<Vec<u8>>> {
        Err(self.unexpected(position, "read_bytes"))
    }
}

impl Cursor for StubCursor {
    type Row = StubRow;
    type Metadata = StubMetadata;

    fn fetch_next(&mut self) -> DriverResult<Option<StubRow>> {
        let fetch = self.calls.fetches.get() + 1;
        self.calls.fetches.set(fetch);
        if self.fail_fetch_at == Some(fetch) {
            return Err("connection reset by peer".into());
        }
        let row = self.rows.get(self.next).cloned();
        self.next += 1;
        Ok(row.map(|cells| StubRow {
            cells,
            calls: Rc::clone(&self.calls),
        }))
    }

    fn metadata(&self) -> DriverResult<StubMetadata> {
        Ok(StubMetadata(self.columns.clone()))
    }

    fn close(&mut self) -> DriverResult<()> {
        self.calls.closes.set(self.calls.closes.get() + 1);
        if self.calls.closes.get() > 1 {
            return Err("cursor already closed".into());
        }
        if self.fail_close {
            return Err("socket closed during release".into());
        }
        Ok(())
    }
}

fn int_rows(n: i32) -> StubCursor {
    StubCursor::new(
        vec![("ID", code::INTEGER)],
        (1..=n).map(|i| vec![StubCell::Int(i)]).collect(),
    )
}

fn single(type_code: i32, cell: StubCell) -> (StubCursor, Rc<Calls>) {
    let cursor = StubCursor::new(vec![("V", type_code)], vec![vec![cell]]);
    let calls = Rc::clone(&cursor.calls);
    (cursor, calls)
}

fn first_value(cursor: StubCursor) -> Value {
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);
    let row = m.advance().unwrap().unwrap();
    m.close().unwrap();
    row.get("V").cloned().unwrap()
}

#[test]
fn empty_cursor_ends_immediately() {
    let cursor = int_rows(0);
    let calls = Rc::clone(&cursor.calls);
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);

    assert_eq!(m.advance().unwrap(), None);
    assert_eq!(m.consume_all().unwrap(), Vec::<Row>::new());
    assert_eq!(calls.fetches.get(), 1);
    m.close().unwrap();
}

#[test]
fn consume_all_on_empty_cursor() {
    let cursor = int_rows(0);
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);

    assert!(m.consume_all().unwrap().is_empty());
    m.close().unwrap();
}

#[test]
fn n_rows_then_end_of_data() {
    for n in [1, 2, 7] {
        let cursor = int_rows(n);
        let catalog = cursor.catalog();
        let mut m = RowMaterializer::new(cursor, catalog);

        for i in 1..=n {
            let row = m.advance().unwrap().expect("row before end of data");
            assert_eq!(row.get("ID"), Some(&Value::Int(i)));
        }
        assert_eq!(m.advance().unwrap(), None);
        assert_eq!(m.state(), State::Exhausted);
        m.close().unwrap();
    }
}

#[test]
fn consume_all_keeps_cursor_order() {
    let cursor = int_rows(5);
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);

    let ids: Vec<Value> = m
        .consume_all()
        .unwrap()
        .iter()
        .map(|r| r.get("ID").cloned().unwrap())
        .collect();
    assert_eq!(ids, (1..=5).map(Value::Int).collect::<Vec<_>>());
    m.close().unwrap();
}

#[test]
fn null_int_skips_int_accessor() {
    let (cursor, calls) = single(code::INTEGER, StubCell::Null);
    assert_eq!(first_value(cursor), Value::Null);
    assert_eq!(calls.int_reads.get(), 0);
}

#[test]
fn non_null_int_uses_int_accessor() {
    let (cursor, calls) = single(code::INTEGER, StubCell::Int(-12));
    assert_eq!(first_value(cursor), Value::Int(-12));
    assert_eq!(calls.int_reads.get(), 1);
}

#[test]
fn float_is_six_place_text() {
    let (cursor, _) = single(code::FLOAT, StubCell::Float(1.0 / 3.0));
    assert_eq!(first_value(cursor), Value::Text("0.333333".to_string()));
}

#[test]
fn big_decimal_is_nearest_double() {
    let (cursor, _) = single(code::NUMERIC, StubCell::Decimal("99.9900"));
    assert_eq!(first_value(cursor), Value::Double(99.99));
}

#[test]
fn unmapped_code_uses_string_accessor() {
    let (cursor, _) = single(1111, StubCell::Text("{\"a\":1}"));
    assert_eq!(first_value(cursor), Value::Text("str:{\"a\":1}".to_string()));
}

#[test]
fn bit_passes_raw_value_through() {
    let (cursor, _) = single(code::BIT, StubCell::Int(1));
    assert_eq!(first_value(cursor), Value::Int(1));
}

#[test]
fn catalog_matches_metadata() {
    let cursor = StubCursor::new(vec![("ID", code::INTEGER), ("NAME", code::VARCHAR)], vec![]);
    let catalog = cursor.catalog();

    let described: Vec<(usize, String, i32)> = catalog
        .iter()
        .map(|c| (c.position, c.label.clone(), c.type_code))
        .collect();
    assert_eq!(
        described,
        vec![
            (1, "ID".to_string(), code::INTEGER),
            (2, "NAME".to_string(), code::VARCHAR),
        ]
    );
}

#[test]
fn second_fetch_failure_is_not_retried() {
    let mut cursor = int_rows(3);
    cursor.fail_fetch_at = Some(2);
    let calls = Rc::clone(&cursor.calls);
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);

    assert!(m.advance().unwrap().is_some());
    assert!(matches!(m.advance(), Err(BridgeError::Fetch(_))));
    assert_eq!(m.state(), State::Failed);

    let third = m.advance().unwrap_err();
    assert!(matches!(third, BridgeError::Failed(_)));
    assert_eq!(third.to_string(), "Result set failed earlier: Fetch error: connection reset by peer");
    assert_eq!(calls.fetches.get(), 2);
    m.close().unwrap();
}

#[test]
fn consume_all_returns_error_not_partial_rows() {
    let mut cursor = int_rows(4);
    cursor.fail_fetch_at = Some(3);
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);

    assert!(matches!(m.consume_all(), Err(BridgeError::Fetch(_))));
    m.close().unwrap();
}

#[test]
fn coercion_error_names_the_column() {
    let cursor = StubCursor::new(
        vec![("ID", code::INTEGER), ("RATIO", code::REAL)],
        vec![vec![StubCell::Int(1), StubCell::Text("oops")]],
    );
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);

    match m.advance() {
        Err(BridgeError::Coercion { position, label, .. }) => {
            assert_eq!(position, 2);
            assert_eq!(label, "RATIO");
        }
        other => panic!("expected coercion error, got {:?}", other),
    }
    m.close().unwrap();
}

#[test]
fn duplicate_labels_last_write_wins() {
    let cursor = StubCursor::new(
        vec![("X", code::INTEGER), ("Y", code::INTEGER), ("X", code::INTEGER)],
        vec![vec![StubCell::Int(1), StubCell::Int(2), StubCell::Int(3)]],
    );
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);
    let row = m.advance().unwrap().unwrap();

    assert_eq!(row.labels().collect::<Vec<_>>(), vec!["X", "Y"]);
    assert_eq!(row.get("X"), Some(&Value::Int(3)));
    m.close().unwrap();
}

#[test]
fn close_reaches_cursor_once() {
    let cursor = int_rows(1);
    let calls = Rc::clone(&cursor.calls);
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);

    assert!(m.advance().unwrap().is_some());
    assert!(m.advance().unwrap().is_none());
    assert_eq!(calls.closes.get(), 0);

    m.close().unwrap();
    m.close().unwrap();
    assert_eq!(calls.closes.get(), 1);
}

#[test]
fn close_failure_is_reported_once() {
    let mut cursor = int_rows(2);
    cursor.fail_close = true;
    let calls = Rc::clone(&cursor.calls);
    let catalog = cursor.catalog();
    let mut m = RowMaterializer::new(cursor, catalog);

    let rows = m.consume_all().unwrap();

    let err = m.close().unwrap_err();
    assert!(matches!(err, BridgeError::Resource(_)));
    assert_eq!(m.state(), State::Closed);
    assert_eq!(calls.closes.get(), 1);

    m.close().unwrap();
    assert_eq!(calls.closes.get(), 1);

    let ids: Vec<_> = rows.iter().map(|r| r.get("ID").cloned().unwrap()).collect();
    assert_eq!(ids, vec![Value::Int(1), Value::Int(2)]);
}

#[test]
fn borrowed_cursor_can_be_materialized() {
    let mut cursor = int_rows(2);
    let catalog = cursor.catalog();
    {
        let mut m = RowMaterializer::new(&mut cursor, catalog);
        assert_eq!(m.consume_all().unwrap().len(), 2);
        m.close().unwrap();
    }
    assert_eq!(cursor.calls.closes.get(), 1);
}
