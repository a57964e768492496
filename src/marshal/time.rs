//! Marshaler for calendar and clock values: dates, times of day,
//! combined date-times with an optional fixed UTC offset, durations and
//! standalone offsets.
//!
//! Each kind flattens into a small integer vector, so under the
//! consumer convention or with no metadata the node is just a numeric
//! leaf; only the native type tag reconstructs the calendar kind.

use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use super::{
    array::normalize,
    mode::{style_for, TZ_OFFSET_ATTR},
    Marshaler, ReadContext, WriteContext,
};
use crate::{
    store::{AttrValue, NodeId},
    value::{ArrayData, ElementType, NdArray, Value},
    StoreError, StoreResult,
};

fn corrupted(reason: &str) -> StoreError {
    StoreError::Corrupted {
        location: "calendar node".into(),
        reason: reason.to_string(),
    }
}

fn date_fields(d: &NaiveDate) -> Vec<i32> {
    vec![d.year(), d.month() as i32, d.day() as i32]
}

fn time_fields(t: &NaiveTime) -> Vec<u32> {
    vec![t.hour(), t.minute(), t.second(), t.nanosecond() / 1_000]
}

fn date_from(fields: &[i32]) -> StoreResult<NaiveDate> {
    match fields {
        [y, m, d] => NaiveDate::from_ymd_opt(*y, *m as u32, *d as u32)
            .ok_or_else(|| corrupted("fields do not form a calendar date")),
        _ => Err(corrupted("date payload must hold three fields")),
    }
}

fn time_from(fields: &[u32]) -> StoreResult<NaiveTime> {
    match fields {
        [h, m, s, micro] => NaiveTime::from_hms_micro_opt(*h, *m, *s, *micro)
            .ok_or_else(|| corrupted("fields do not form a time of day")),
        _ => Err(corrupted("time payload must hold four fields")),
    }
}

fn datetime_from(fields: &[i64]) -> StoreResult<NaiveDateTime> {
    match fields {
        [y, mo, d, h, mi, s, micro] => {
            let date = NaiveDate::from_ymd_opt(
                i32::try_from(*y).map_err(|_| corrupted("year out of range"))?,
                *mo as u32,
                *d as u32,
            )
            .ok_or_else(|| corrupted("fields do not form a calendar date"))?;
            let time = NaiveTime::from_hms_micro_opt(*h as u32, *mi as u32, *s as u32, *micro as u32)
                .ok_or_else(|| corrupted("fields do not form a time of day"))?;
            Ok(date.and_time(time))
        }
        _ => Err(corrupted("date-time payload must hold seven fields")),
    }
}

pub struct TimeMarshaler;

impl TimeMarshaler {
    fn payload(value: &Value) -> StoreResult<(&'static str, &'static str, NdArray)> {
        let out = match value {
            Value::Date(d) => (
                "date",
                "int32",
                NdArray::new(vec![3], ElementType::I32, ArrayData::I32(date_fields(d)))?,
            ),
            Value::Time(t) => (
                "time",
                "uint32",
                NdArray::new(vec![4], ElementType::U32, ArrayData::U32(time_fields(t)))?,
            ),
            Value::DateTime { naive, .. } => {
                let d = naive.date();
                let t = naive.time();
                let fields = vec![
                    d.year() as i64,
                    d.month() as i64,
                    d.day() as i64,
                    t.hour() as i64,
                    t.minute() as i64,
                    t.second() as i64,
                    (t.nanosecond() / 1_000) as i64,
                ];
                (
                    "datetime",
                    "int64",
                    NdArray::new(vec![7], ElementType::I64, ArrayData::I64(fields))?,
                )
            }
            Value::Duration {
                days,
                seconds,
                micros,
            } => (
                "duration",
                "int64",
                NdArray::new(
                    vec![3],
                    ElementType::I64,
                    ArrayData::I64(vec![*days, *seconds, *micros]),
                )?,
            ),
            Value::TzOffset(seconds) => (
                "tzoffset",
                "int32",
                NdArray::scalar(ElementType::I32, ArrayData::I32(vec![*seconds]))?,
            ),
            other => {
                return Err(StoreError::TypeMismatch(format!(
                    "{:?} is not a calendar value",
                    other.kind()
                )))
            }
        };
        Ok(out)
    }
}

impl Marshaler for TimeMarshaler {
    fn type_tag(&self) -> &'static str {
        "datetime"
    }

    fn read_tags(&self) -> &'static [&'static str] {
        &["date", "time", "datetime", "duration", "tzoffset"]
    }

    fn handles_value(&self, value: &Value) -> bool {
        matches!(
            value,
            Value::Date(_)
                | Value::Time(_)
                | Value::DateTime { .. }
                | Value::Duration { .. }
                | Value::TzOffset(_)
        )
    }

    fn write(
        &self,
        cx: &mut WriteContext<'_>,
        value: &Value,
        parent: NodeId,
        name: &str,
    ) -> StoreResult<NodeId> {
        let (tag, class, arr) = Self::payload(value)?;
        let style = style_for(value.kind(), cx.options.mode());
        let node = cx.place_leaf(parent, name, normalize(&arr, &style)?)?;
        if let Value::DateTime {
            offset_seconds: Some(offset),
            ..
        } = value
        {
            if cx.options.store_metadata() {
                cx.store
                    .set_attr(node, TZ_OFFSET_ATTR, AttrValue::Int(*offset as i64))?;
            }
        }
        cx.annotate(node, tag, class, false)?;
        Ok(node)
    }

    fn read(&self, cx: &mut ReadContext<'_>, node: NodeId) -> StoreResult<Value> {
        let arr = cx.store.leaf_data(node)?;
        // The integer layout identifies the kind: element type plus
        // field count are disjoint across the five kinds.
        match arr.data() {
            ArrayData::I32(v) if arr.ndim() == 0 => Ok(Value::TzOffset(v[0])),
            ArrayData::I32(v) => Ok(Value::Date(date_from(v)?)),
            ArrayData::U32(v) => Ok(Value::Time(time_from(v)?)),
            ArrayData::I64(v) if v.len() == 3 => Ok(Value::Duration {
                days: v[0],
                seconds: v[1],
                micros: v[2],
            }),
            ArrayData::I64(v) => {
                let naive = datetime_from(v)?;
                let offset_seconds = cx
                    .store
                    .get_attr(node, TZ_OFFSET_ATTR)?
                    .and_then(|a| a.as_int())
                    .map(|i| i as i32);
                Ok(Value::DateTime {
                    naive,
                    offset_seconds,
                })
            }
            _ => Err(corrupted("unrecognized calendar payload")),
        }
    }
}
