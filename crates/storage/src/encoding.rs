use chrono::NaiveDate;
use corpusql_lib_core::{ExecutionError, Position, PositionList};

/// Fixed-width record layout: `u32 docId, i32 sentenceId, u32 begin,
/// u32 end, i64 epoch-day`, all
/// big-endian so lexicographic byte order matches numeric order for
/// range iteration.
const RECORD_LEN: usize = 4 + 4 + 4 + 4 + 8;

pub fn encode(list: &PositionList) -> Vec<u8> {
    let positions = list.as_slice();
    let mut buf = Vec::with_capacity(4 + positions.len() * RECORD_LEN);
    buf.extend_from_slice(&(positions.len() as u32).to_be_bytes());
    for p in positions {
        buf.extend_from_slice(&p.doc_id.to_be_bytes());
        buf.extend_from_slice(&p.sentence_id.to_be_bytes());
        buf.extend_from_slice(&p.begin_char.to_be_bytes());
        buf.extend_from_slice(&p.end_char.to_be_bytes());
        buf.extend_from_slice(&epoch_day(p.doc_date).to_be_bytes());
    }
    buf
}

pub fn decode(key: &[u8], bytes: &[u8]) -> Result<PositionList, ExecutionError> {
    if bytes.len() < 4 {
        return Err(corrupt(key, "truncated length prefix"));
    }
    let count = u32::from_be_bytes(bytes[0..4].try_into().unwrap()) as usize;
    let expected_len = 4 + count * RECORD_LEN;
    if bytes.len() != expected_len {
        return Err(corrupt(key, "length prefix does not match payload size"));
    }

    let mut positions = Vec::with_capacity(count);
    let mut offset = 4;
    for _ in 0..count {
        let rec = &bytes[offset..offset + RECORD_LEN];
        let doc_id = u32::from_be_bytes(rec[0..4].try_into().unwrap());
        let sentence_id = i32::from_be_bytes(rec[4..8].try_into().unwrap());
        let begin_char = u32::from_be_bytes(rec[8..12].try_into().unwrap());
        let end_char = u32::from_be_bytes(rec[12..16].try_into().unwrap());
        let epoch = i64::from_be_bytes(rec[16..24].try_into().unwrap());
        let doc_date = date_from_epoch_day(epoch).ok_or_else(|| corrupt(key, "epoch day out of range"))?;
        if begin_char > end_char {
            return Err(corrupt(key, "begin_char exceeds end_char"));
        }
        positions.push(Position::new(doc_id, sentence_id, begin_char, end_char, doc_date));
        offset += RECORD_LEN;
    }
    Ok(PositionList::new(positions))
}

fn corrupt(key: &[u8], reason: &str) -> ExecutionError {
    ExecutionError::ReadError {
        key: String::from_utf8_lossy(key).into_owned(),
        reason: reason.to_string(),
    }
}

const UNIX_EPOCH_DAY_OFFSET: i64 = 719_163; // days from 0000-01-01 to 1970-01-01

fn epoch_day(date: NaiveDate) -> i64 {
    date.num_days_from_ce() as i64 - UNIX_EPOCH_DAY_OFFSET
}

fn date_from_epoch_day(epoch_day: i64) -> Option<NaiveDate> {
    let ce_day = epoch_day + UNIX_EPOCH_DAY_OFFSET;
    NaiveDate::from_num_days_from_ce_opt(ce_day as i32)
}
