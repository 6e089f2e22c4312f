//! Parquet footer reading.
//!
//! A Parquet file ends with a Thrift compact-protocol `FileMetaData`, its
//! little-endian length, and `PAR1`.  Only the schema and the row count are
//! decoded; everything else is skipped field by field.

use anyhow::{bail, Context, Result};

/// Schema leaves and the total row count.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct Footer {
    pub(crate) num_rows: i64,
    /// `(name, physical type)` for every leaf column.
    pub(crate) columns: Vec<(String, Option<i32>)>,
}

impl Footer {
    /// BOOLEAN and BYTE_ARRAY/FIXED_LEN_BYTE_ARRAY are not numeric.
    pub(crate) fn numeric_columns(&self) -> usize {
        self.columns.iter().filter(|(_, t)| matches!(t, Some(1..=5))).count()
    }

    pub(crate) fn text_columns(&self) -> usize {
        self.columns.iter().filter(|(_, t)| matches!(t, Some(6) | Some(7))).count()
    }
}

pub(crate) fn read_footer(data: &[u8]) -> Result<Footer> {
    if data.len() < 12 || !data.starts_with(b"PAR1") || !data.ends_with(b"PAR1") {
        bail!("missing PAR1 markers");
    }
    let len_at = data.len() - 8;
    let len = u32::from_le_bytes([data[len_at], data[len_at + 1], data[len_at + 2], data[len_at + 3]]) as usize;
    let start = len_at.checked_sub(len).context("footer length exceeds file size")?;
    let mut r = Compact { data: &data[start..len_at], pos: 0 };
    file_metadata(&mut r).context("decoding footer")
}

// Thrift compact type ids
const T_BOOL_TRUE: u8 = 1;
const T_BOOL_FALSE: u8 = 2;
const T_BYTE: u8 = 3;
const T_I16: u8 = 4;
const T_I32: u8 = 5;
const T_I64: u8 = 6;
const T_DOUBLE: u8 = 7;
const T_BINARY: u8 = 8;
const T_LIST: u8 = 9;
const T_SET: u8 = 10;
const T_MAP: u8 = 11;
const T_STRUCT: u8 = 12;

struct Compact<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Compact<'a> {
    fn byte(&mut self) -> Result<u8> {
        let b = *self.data.get(self.pos).context("unexpected end of footer")?;
        self.pos += 1;
        Ok(b)
    }

    fn varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for shift in (0..64).step_by(7) {
            let b = self.byte()?;
            value |= u64::from(b & 0x7f) << shift;
            if b & 0x80 == 0 {
                return Ok(value);
            }
        }
        bail!("varint too long")
    }

    fn zigzag(&mut self) -> Result<i64> {
        let v = self.varint()?;
        Ok((v >> 1) as i64 ^ -((v & 1) as i64))
    }

    fn binary(&mut self) -> Result<&'a [u8]> {
        let len = self.varint()? as usize;
        let end = self.pos.checked_add(len).filter(|&e| e <= self.data.len());
        let end = end.context("binary field past end of footer")?;
        let data = self.data;
        let out = &data[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    /// Next field header as `(id, type)`; `None` at the struct's stop byte.
    fn field(&mut self, last_id: &mut i16) -> Result<Option<(i16, u8)>> {
        let b = self.byte()?;
        if b == 0 {
            return Ok(None);
        }
        let delta = (b >> 4) as i16;
        let id = if delta == 0 { self.zigzag()? as i16 } else { *last_id + delta };
        *last_id = id;
        Ok(Some((id, b & 0x0f)))
    }

    fn list_header(&mut self) -> Result<(usize, u8)> {
        let b = self.byte()?;
        let size = match b >> 4 {
            15 => self.varint()? as usize,
            n => n as usize,
        };
        Ok((size, b & 0x0f))
    }

    fn skip(&mut self, ty: u8) -> Result<()> {
        match ty {
            T_BOOL_TRUE | T_BOOL_FALSE => {}
            T_BYTE => {
                self.byte()?;
            }
            T_I16 | T_I32 | T_I64 => {
                self.varint()?;
            }
            T_DOUBLE => {
                for _ in 0..8 {
                    self.byte()?;
                }
            }
            T_BINARY => {
                self.binary()?;
            }
            T_LIST | T_SET => {
                let (size, elem) = self.list_header()?;
                for _ in 0..size {
                    self.skip_element(elem)?;
                }
            }
            T_MAP => {
                let size = self.varint()? as usize;
                if size > 0 {
                    let kinds = self.byte()?;
                    for _ in 0..size {
                        self.skip_element(kinds >> 4)?;
                        self.skip_element(kinds & 0x0f)?;
                    }
                }
            }
            T_STRUCT => {
                let mut last = 0;
                while let Some((_, ty)) = self.field(&mut last)? {
                    self.skip(ty)?;
                }
            }
            other => bail!("unknown thrift type {other}"),
        }
        Ok(())
    }

    /// Booleans inside containers take a whole byte.
    fn skip_element(&mut self, ty: u8) -> Result<()> {
        if ty == T_BOOL_TRUE || ty == T_BOOL_FALSE {
            self.byte().map(|_| ())
        } else {
            self.skip(ty)
        }
    }
}

fn file_metadata(r: &mut Compact<'_>) -> Result<Footer> {
    let mut footer = Footer::default();
    let mut last = 0;
    while let Some((id, ty)) = r.field(&mut last)? {
        match (id, ty) {
            (2, T_LIST) => {
                let (size, elem) = r.list_header()?;
                if elem != T_STRUCT {
                    bail!("schema is not a list of structs");
                }
                for _ in 0..size {
                    let (name, physical, children) = schema_element(r)?;
                    if children == 0 {
                        footer.columns.push((name, physical));
                    }
                }
            }
            (3, T_I64) => footer.num_rows = r.zigzag()?,
            (_, ty) => r.skip(ty)?,
        }
    }
    Ok(footer)
}

/// `(name, type, num_children)` of one `SchemaElement`.
fn schema_element(r: &mut Compact<'_>) -> Result<(String, Option<i32>, i64)> {
    let mut name = String::new();
    let mut physical = None;
    let mut children = 0;
    let mut last = 0;
    while let Some((id, ty)) = r.field(&mut last)? {
        match (id, ty) {
            (1, T_I32) => physical = Some(r.zigzag()? as i32),
            (4, T_BINARY) => name = String::from_utf8_lossy(r.binary()?).into_owned(),
            (5, T_I32) => children = r.zigzag()?,
            (_, ty) => r.skip(ty)?,
        }
    }
    Ok((name, physical, children))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    fn zigzag(v: i64) -> Vec<u8> {
        let mut n = ((v << 1) ^ (v >> 63)) as u64;
        let mut out = Vec::new();
        loop {
            let b = (n & 0x7f) as u8;
            n >>= 7;
            if n == 0 {
                out.push(b);
                return out;
            }
            out.push(b | 0x80);
        }
    }

    fn element(out: &mut Vec<u8>, name: &str, physical: Option<i32>, children: Option<i32>) {
        let mut last = 0;
        if let Some(t) = physical {
            out.push((1 - last) << 4 | T_I32);
            out.extend(zigzag(t as i64));
            last = 1;
        }
        out.push(((4 - last) as u8) << 4 | T_BINARY);
        out.push(name.len() as u8);
        out.extend_from_slice(name.as_bytes());
        if let Some(c) = children {
            out.push((1u8) << 4 | T_I32);
            out.extend(zigzag(c as i64));
        }
        out.push(0);
    }

    /// `id INT64, price DOUBLE, label BYTE_ARRAY`, 42 rows.
    pub(crate) fn sample_file() -> Vec<u8> {
        let mut meta = Vec::new();
        // 1: version
        meta.push(0x10 | T_I32);
        meta.extend(zigzag(1));
        // 2: schema
        meta.push(0x10 | T_LIST);
        meta.push(0x40 | T_STRUCT);
        element(&mut meta, "schema", None, Some(3));
        element(&mut meta, "id", Some(2), None);
        element(&mut meta, "price", Some(5), None);
        element(&mut meta, "label", Some(6), None);
        // 3: num_rows
        meta.push(0x10 | T_I64);
        meta.extend(zigzag(42));
        // 4: row_groups, empty list
        meta.push(0x10 | T_LIST);
        meta.push(T_STRUCT);
        // 6: created_by
        meta.push(0x20 | T_BINARY);
        meta.push(4);
        meta.extend_from_slice(b"test");
        meta.push(0);

        let mut file = b"PAR1".to_vec();
        file.extend_from_slice(&[0u8; 16]);
        file.extend_from_slice(&meta);
        file.extend_from_slice(&(meta.len() as u32).to_le_bytes());
        file.extend_from_slice(b"PAR1");
        file
    }

    #[test]
    fn test_read_footer() {
        let footer = read_footer(&sample_file()).unwrap();
        assert_eq!(footer.num_rows, 42);
        assert_eq!(
            footer.columns,
            vec![
                ("id".to_string(), Some(2)),
                ("price".to_string(), Some(5)),
                ("label".to_string(), Some(6)),
            ]
        );
        assert_eq!(footer.numeric_columns(), 2);
        assert_eq!(footer.text_columns(), 1);
    }

    #[test]
    fn test_bad_footer() {
        assert!(read_footer(b"PAR1").is_err());
        let mut file = sample_file();
        let n = file.len();
        file[n - 8..n - 4].copy_from_slice(&10_000u32.to_le_bytes());
        assert!(read_footer(&file).is_err());
    }
}
