use crate::store::TypedValue;
use crate::PvResult;
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

/// The framed record exchanged with a store bridge: a handle, a millisecond
/// stamp, the deletion and quality flags, and the encoded typed value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StoreValue {
    /// Server handle of the point.
    pub handle: i32,
    /// Time stamp, in milliseconds.
    pub stamp: i64,
    /// Whether this record marks a deletion.
    pub deleted: bool,
    /// Quality code.
    pub quality: i32,
    /// The typed value.
    pub value: TypedValue,
}

impl StoreValue {
    pub fn new(handle: i32, stamp: i64, value: TypedValue) -> Self {
        Self {
            handle,
            stamp,
            deleted: false,
            quality: 0,
            value,
        }
    }

    /// A deletion marker for the point at `stamp`.
    pub fn deleted(handle: i32, stamp: i64) -> Self {
        Self {
            handle,
            stamp,
            deleted: true,
            quality: 0,
            value: TypedValue::null(),
        }
    }

    /// Writes the record: `handle:i32 stamp:i64 deleted:u8 quality:i32
    /// size:u32 value[size]`, all big-endian.
    pub fn emit(&self, w: &mut dyn std::io::Write) -> PvResult<()> {
        w.write_i32::<BigEndian>(self.handle)?;
        w.write_i64::<BigEndian>(self.stamp)?;
        w.write_u8(u8::from(self.deleted))?;
        w.write_i32::<BigEndian>(self.quality)?;
        #[allow(clippy::cast_possible_truncation)]
        w.write_u32::<BigEndian>(self.value.as_bytes().len() as u32)?;
        w.write_all(self.value.as_bytes())?;
        Ok(())
    }

    /// Reads one record written by [`emit`](Self::emit).
    pub fn parse(rdr: &mut dyn std::io::Read) -> PvResult<Self> {
        let handle = rdr.read_i32::<BigEndian>()?;
        let stamp = rdr.read_i64::<BigEndian>()?;
        let deleted = rdr.read_u8()? != 0;
        let quality = rdr.read_i32::<BigEndian>()?;
        let size = rdr.read_u32::<BigEndian>()? as usize;

        let mut bytes = vec![0_u8; size];
        rdr.read_exact(&mut bytes)?;
        let value = TypedValue::from_bytes(bytes)?;

        Ok(Self {
            handle,
            stamp,
            deleted,
            quality,
            value,
        })
    }
}
