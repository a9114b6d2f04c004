//! Optional Arrow interop (`arrow` feature, off by default): convert a
//! fully read `(Dictionary, Vec<Case>)` pair into an Arrow `RecordBatch`.
//!
//! This is a caller convenience layered on top of the codec, not part of
//! it -- spec.md §3 treats the dictionary and case types as the codec's
//! own opaque containers, so nothing in [`crate::reader`] or
//! [`crate::writer`] depends on this module.

use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Builder, StringBuilder};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;

use crate::constants::VarType;
use crate::error::{Result, SpssError};
use crate::model::{Case, Dictionary, Value};

/// Build an Arrow `Schema` from a dictionary: one `Float64` field per
/// numeric variable, one `Utf8` field per string variable, named by each
/// variable's display name ([`crate::model::Variable::name`]).
pub fn build_schema(dictionary: &Dictionary) -> Schema {
    let fields: Vec<Field> = dictionary
        .variables()
        .iter()
        .map(|var| {
            let data_type = match var.var_type() {
                VarType::Numeric => DataType::Float64,
                VarType::String(_) => DataType::Utf8,
            };
            Field::new(var.name(), data_type, true)
        })
        .collect();
    Schema::new(fields)
}

/// Convert a slice of already-decoded [`Case`]s into a `RecordBatch`
/// matching `dictionary`'s column order.
pub fn rows_to_record_batch(dictionary: &Dictionary, cases: &[Case]) -> Result<RecordBatch> {
    let schema = build_schema(dictionary);
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(dictionary.variables().len());

    for (col_idx, var) in dictionary.variables().iter().enumerate() {
        let column: ArrayRef = match var.var_type() {
            VarType::Numeric => {
                let mut builder = Float64Builder::with_capacity(cases.len());
                for case in cases {
                    match case.get(col_idx) {
                        Some(Value::Numeric(v)) if !crate::constants::is_sysmis(*v) => builder.append_value(*v),
                        Some(Value::Numeric(_)) | None => builder.append_null(),
                        Some(Value::Str(_)) => {
                            return Err(SpssError::CorruptRecord {
                                tag: 0,
                                detail: format!("variable {:?} is numeric but case held a string", var.name()),
                            });
                        }
                    }
                }
                Arc::new(builder.finish())
            }
            VarType::String(_) => {
                let mut builder = StringBuilder::with_capacity(cases.len(), cases.len() * 8);
                for case in cases {
                    match case.get(col_idx) {
                        Some(Value::Str(s)) => builder.append_value(s),
                        Some(Value::Numeric(_)) => {
                            return Err(SpssError::CorruptRecord {
                                tag: 0,
                                detail: format!("variable {:?} is a string but case held a number", var.name()),
                            });
                        }
                        None => builder.append_null(),
                    }
                }
                Arc::new(builder.finish())
            }
        };
        columns.push(column);
    }

    RecordBatch::try_new(Arc::new(schema), columns).map_err(|e| SpssError::CorruptRecord {
        tag: 0,
        detail: format!("failed to assemble Arrow RecordBatch: {e}"),
    })
}
