use chrono::NaiveDate;
use corpusql_lib_core::{JoinError, JoinType, TemporalPredicate};
use smol_str::SmolStr;

use crate::result::{Cell, Row, Table};

/// An explicit state machine for subquery/temporal joins, so each
/// phase is independently testable instead of buried in control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinState {
    BuildLeft,
    BuildRight,
    InnerScan,
    OuterFill,
    Done,
}

pub struct JoinSpec {
    pub left_column: SmolStr,
    pub right_column: SmolStr,
    pub right_alias: SmolStr,
    pub join_type: JoinType,
    pub predicate: TemporalPredicate,
    pub proximity_window_days: Option<u32>,
}

pub struct JoinExecutor {
    spec: JoinSpec,
    state: JoinState,
    left: Option<Table>,
    right: Option<Table>,
    output: Option<Table>,
    left_matched: Vec<bool>,
    right_matched: Vec<bool>,
}

impl JoinExecutor {
    pub fn new(spec: JoinSpec) -> Result<Self, JoinError> {
        if spec.predicate == TemporalPredicate::Proximity {
            match spec.proximity_window_days {
                Some(w) if w > 0 => {}
                _ => return Err(JoinError::MissingProximityWindow),
            }
        }
        Ok(Self {
            spec,
            state: JoinState::BuildLeft,
            left: None,
            right: None,
            output: None,
            left_matched: Vec::new(),
            right_matched: Vec::new(),
        })
    }

    pub fn state(&self) -> JoinState {
        self.state
    }

    /// Drives the state machine to completion, given the already
    /// executed (and projected) left and right tables.
    pub fn run(&mut self, left: Table, right: Table) -> Result<Table, JoinError> {
        self.advance(JoinState::BuildLeft, left)?;
        self.advance(JoinState::BuildRight, right)?;
        self.advance_inner_scan()?;
        if matches!(self.spec.join_type, JoinType::Left | JoinType::Right) {
            self.advance_outer_fill()?;
        }
        self.state = JoinState::Done;
        Ok(self.output.take().unwrap_or_default())
    }

    fn advance(&mut self, expected: JoinState, table: Table) -> Result<(), JoinError> {
        debug_assert_eq!(self.state, expected);
        match expected {
            JoinState::BuildLeft => {
                let idx = column_index(&table, &self.spec.left_column)?;
                validate_date_column(&table, idx, &self.spec.left_column)?;
                self.left = Some(table);
                self.state = JoinState::BuildRight;
            }
            JoinState::BuildRight => {
                let idx = column_index(&table, &self.spec.right_column)?;
                validate_date_column(&table, idx, &self.spec.right_column)?;
                self.right = Some(table);
                self.state = JoinState::InnerScan;
            }
            _ => unreachable!("advance only drives BuildLeft/BuildRight"),
        }
        Ok(())
    }

    fn advance_inner_scan(&mut self) -> Result<(), JoinError> {
        let left = self.left.as_ref().expect("left built");
        let right = self.right.as_ref().expect("right built");
        let left_idx = column_index(left, &self.spec.left_column)?;
        let right_idx = column_index(right, &self.spec.right_column)?;

        let mut columns = left.columns.clone();
        for c in &right.columns {
            if columns.contains(c) {
                columns.push(format!("{}_{c}", self.spec.right_alias));
            } else {
                columns.push(c.clone());
            }
        }

        let mut rows = Vec::new();
        let mut matched_left = vec![false; left.rows.len()];
        let mut matched_right = vec![false; right.rows.len()];

        for (li, lrow) in left.rows.iter().enumerate() {
            let ldate = cell_date(&lrow.0[left_idx]).expect("left column validated as all-date");
            for (ri, rrow) in right.rows.iter().enumerate() {
                let rdate = cell_date(&rrow.0[right_idx]).expect("right column validated as all-date");
                if self.satisfies(ldate, rdate) {
                    matched_left[li] = true;
                    matched_right[ri] = true;
                    rows.push(append_row(lrow, rrow));
                }
            }
        }

        self.output = Some(Table { columns, rows });
        self.state = JoinState::OuterFill;
        self.left_matched = matched_left;
        self.right_matched = matched_right;
        Ok(())
    }

    fn advance_outer_fill(&mut self) -> Result<(), JoinError> {
        let left = self.left.as_ref().expect("left built");
        let right = self.right.as_ref().expect("right built");
        let output = self.output.as_mut().expect("inner scan ran");

        if matches!(self.spec.join_type, JoinType::Left) {
            for (li, lrow) in left.rows.iter().enumerate() {
                if !self.left_matched[li] {
                    output.rows.push(append_row_missing_right(lrow, right.columns.len()));
                }
            }
        }
        if matches!(self.spec.join_type, JoinType::Right) {
            for (ri, rrow) in right.rows.iter().enumerate() {
                if !self.right_matched[ri] {
                    output
                        .rows
                        .push(prepend_row_missing_left(left.columns.len(), rrow));
                }
            }
        }
        Ok(())
    }

    fn satisfies(&self, left: NaiveDate, right: NaiveDate) -> bool {
        match self.spec.predicate {
            TemporalPredicate::Equal
            | TemporalPredicate::Contains
            | TemporalPredicate::ContainedBy
            | TemporalPredicate::Intersect => left == right,
            TemporalPredicate::Proximity => {
                let window = self.spec.proximity_window_days.unwrap_or(0) as i64;
                (left - right).num_days().abs() <= window
            }
            TemporalPredicate::Before => left < right,
            TemporalPredicate::After => left > right,
            TemporalPredicate::BeforeEqual => left <= right,
            TemporalPredicate::AfterEqual => left >= right,
            TemporalPredicate::Between => left == right,
        }
    }
}

fn column_index(table: &Table, name: &str) -> Result<usize, JoinError> {
    table
        .columns
        .iter()
        .position(|c| c == name)
        .ok_or_else(|| JoinError::MissingColumn(name.to_string()))
}

/// A temporal join's columns must all parse as dates; a non-empty
/// table with even one cell that doesn't is rejected up front rather
/// than silently filtered row-by-row during the scan.
fn validate_date_column(table: &Table, idx: usize, name: &str) -> Result<(), JoinError> {
    let all_dates = table.rows.iter().all(|row| cell_date(&row.0[idx]).is_some());
    if all_dates {
        Ok(())
    } else {
        Err(JoinError::NonDateColumn(name.to_string()))
    }
}

fn cell_date(cell: &Cell) -> Option<NaiveDate> {
    match cell {
        Cell::Text(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").ok(),
        _ => None,
    }
}

fn append_row(left: &Row, right: &Row) -> Row {
    let mut cells = left.0.clone();
    cells.extend(right.0.clone());
    Row(cells)
}

fn append_row_missing_right(left: &Row, right_len: usize) -> Row {
    let mut cells = left.0.clone();
    cells.extend(std::iter::repeat(Cell::Empty).take(right_len));
    Row(cells)
}

fn prepend_row_missing_left(left_len: usize, right: &Row) -> Row {
    let mut cells: Vec<Cell> = std::iter::repeat(Cell::Empty).take(left_len).collect();
    cells.extend(right.0.clone());
    Row(cells)
}
