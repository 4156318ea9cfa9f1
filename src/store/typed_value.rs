use crate::store::ValueType;
use crate::{PvError, PvResult};
use byteorder::{BigEndian, ReadBytesExt};

/// Largest data block in a split payload.
pub const MAX_BYTES_BLOCK: usize = 65_534;

/// A self-describing typed value.
///
/// The encoding is a type byte followed by the payload: numeric payloads are
/// big-endian at their natural width, string-like payloads are *block-split*
/// into `(u16 length BE, bytes)` chunks of at most [`MAX_BYTES_BLOCK`] bytes,
/// terminated by a zero-length chunk. The absent value encodes to the empty
/// sequence.
#[derive(Clone, Eq, PartialEq)]
pub struct TypedValue {
    value_type: ValueType,
    bytes: Vec<u8>,
}

impl std::fmt::Debug for TypedValue {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "TypedValue {{ {}, 0x{} }}",
            self.value_type,
            hex::encode(&self.bytes)
        )
    }
}

impl Default for TypedValue {
    fn default() -> Self {
        Self::null()
    }
}

impl TypedValue {
    pub fn null() -> Self {
        Self {
            value_type: ValueType::Null,
            bytes: Vec::new(),
        }
    }

    pub fn from_double(value: f64) -> Self {
        Self::fixed(ValueType::Double, &value.to_be_bytes())
    }

    pub fn from_long(value: i64) -> Self {
        Self::fixed(ValueType::Long, &value.to_be_bytes())
    }

    pub fn from_boolean(value: bool) -> Self {
        Self::fixed(ValueType::Boolean, &[u8::from(value)])
    }

    pub fn from_short(value: i16) -> Self {
        Self::fixed(ValueType::Short, &value.to_be_bytes())
    }

    pub fn from_integer(value: i32) -> Self {
        Self::fixed(ValueType::Integer, &value.to_be_bytes())
    }

    pub fn from_float(value: f32) -> Self {
        Self::fixed(ValueType::Float, &value.to_be_bytes())
    }

    pub fn from_character(value: u8) -> Self {
        Self::fixed(ValueType::Character, &[value])
    }

    pub fn from_byte(value: i8) -> Self {
        Self::fixed(ValueType::Byte, &value.to_be_bytes())
    }

    pub fn from_string(value: &str) -> Self {
        Self::split(ValueType::String, value.as_bytes())
    }

    pub fn from_byte_array(value: &[u8]) -> Self {
        Self::split(ValueType::ByteArray, value)
    }

    /// A state value; the split content is `"<code>[:<name>]"`.
    pub fn from_state(code: Option<i32>, name: Option<&str>) -> Self {
        let mut content = String::new();
        if let Some(code) = code {
            content.push_str(&code.to_string());
        }
        if let Some(name) = name {
            content.push(':');
            content.push_str(name);
        }
        Self::split(ValueType::State, content.as_bytes())
    }

    /// Adopts an encoded value, validating its framing.
    pub fn from_bytes(bytes: Vec<u8>) -> PvResult<Self> {
        let Some(&code) = bytes.first() else {
            return Ok(Self::null());
        };
        let value_type = ValueType::try_new(code)?;
        let payload = &bytes[1..];

        match value_type {
            ValueType::Null | ValueType::Object => {}
            ValueType::Double | ValueType::Long => expect_width(payload, 8)?,
            ValueType::Boolean | ValueType::Character | ValueType::Byte => {
                expect_width(payload, 1)?;
            }
            ValueType::Short => expect_width(payload, 2)?,
            ValueType::Integer | ValueType::Float => expect_width(payload, 4)?,
            ValueType::String | ValueType::ByteArray | ValueType::State => {
                let (_, rest) = join_split(payload)?;
                if !rest.is_empty() {
                    return Err(PvError::MalformedValue(
                        "trailing bytes after the split terminator",
                    ));
                }
            }
        }

        Ok(Self { value_type, bytes })
    }

    pub fn value_type(&self) -> ValueType {
        self.value_type
    }

    pub fn is_null(&self) -> bool {
        self.value_type == ValueType::Null
    }

    /// The encoded form.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Coerces to a double: defined for DOUBLE, FLOAT, the integer types,
    /// and STRING (parsed as a full floating-point number).
    pub fn to_double(&self) -> PvResult<f64> {
        match self.value_type {
            ValueType::Double => {
                let mut rdr = &self.bytes[1..];
                Ok(rdr.read_f64::<BigEndian>()?)
            }
            ValueType::Float => {
                let mut rdr = &self.bytes[1..];
                Ok(f64::from(rdr.read_f32::<BigEndian>()?))
            }
            ValueType::Long | ValueType::Integer | ValueType::Short | ValueType::Byte => {
                #[allow(clippy::cast_precision_loss)]
                Ok(self.to_long()? as f64)
            }
            ValueType::String => self
                .to_string_value()?
                .parse::<f64>()
                .map_err(|_| self.conversion_error("double")),
            _ => Err(self.conversion_error("double")),
        }
    }

    /// Coerces to a long: defined for the integer types, BOOLEAN, DOUBLE and
    /// FLOAT (truncating), and STRING (parsed as a full decimal or `0x`
    /// hexadecimal number).
    pub fn to_long(&self) -> PvResult<i64> {
        let mut rdr = self.bytes.get(1..).unwrap_or_default();
        match self.value_type {
            ValueType::Long => Ok(rdr.read_i64::<BigEndian>()?),
            ValueType::Integer => Ok(i64::from(rdr.read_i32::<BigEndian>()?)),
            ValueType::Short => Ok(i64::from(rdr.read_i16::<BigEndian>()?)),
            ValueType::Byte => Ok(i64::from(rdr.read_i8()?)),
            ValueType::Boolean => Ok(i64::from(self.bytes[1] != 0)),
            ValueType::String => parse_long(&self.to_string_value()?)
                .ok_or_else(|| self.conversion_error("long")),
            ValueType::Double | ValueType::Float => {
                #[allow(clippy::cast_possible_truncation)]
                Ok(self.to_double()? as i64)
            }
            _ => Err(self.conversion_error("long")),
        }
    }

    /// The joined text of a STRING value.
    pub fn to_string_value(&self) -> PvResult<String> {
        if self.value_type != ValueType::String {
            return Err(self.conversion_error("string"));
        }
        join_text(&self.bytes[1..])
    }

    /// The joined bytes of a BYTE_ARRAY value.
    pub fn to_byte_array(&self) -> PvResult<Vec<u8>> {
        if self.value_type != ValueType::ByteArray {
            return Err(self.conversion_error("byte array"));
        }
        let (joined, _) = join_split(&self.bytes[1..])?;
        Ok(joined)
    }

    /// The state code: the decimal prefix of a STATE value (0 when empty),
    /// or the long coercion of any other type.
    pub fn state_code(&self) -> PvResult<i32> {
        if self.value_type == ValueType::State {
            let content = join_text(&self.bytes[1..])?;
            let prefix = content.split(':').next().unwrap_or("");
            return Ok(parse_decimal_prefix(prefix));
        }
        #[allow(clippy::cast_possible_truncation)]
        Ok(self.to_long()? as i32)
    }

    /// The state name: the suffix after `:` of a STATE value (`None` when
    /// absent), or the string coercion of any other type.
    pub fn state_name(&self) -> PvResult<Option<String>> {
        if self.value_type == ValueType::State {
            let content = join_text(&self.bytes[1..])?;
            return Ok(content
                .split_once(':')
                .map(|(_, name)| name.to_string()));
        }
        self.to_string_value().map(Some)
    }

    fn fixed(value_type: ValueType, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + payload.len());
        bytes.push(value_type.code());
        bytes.extend_from_slice(payload);
        Self { value_type, bytes }
    }

    fn split(value_type: ValueType, payload: &[u8]) -> Self {
        let mut bytes = Vec::with_capacity(1 + split_len(payload.len()));
        bytes.push(value_type.code());
        push_split(&mut bytes, payload);
        Self { value_type, bytes }
    }

    fn conversion_error(&self, to: &'static str) -> PvError {
        PvError::ValueConversion {
            from: self.value_type,
            to,
        }
    }
}

// Exact encoded length of a split payload: the data plus two bytes per data
// chunk plus the terminator.
fn split_len(payload_len: usize) -> usize {
    let chunks = (payload_len + MAX_BYTES_BLOCK - 1) / MAX_BYTES_BLOCK;
    payload_len + 2 * (chunks + 1)
}

fn push_split(bytes: &mut Vec<u8>, payload: &[u8]) {
    let mut rest = payload;
    loop {
        let length = rest.len().min(MAX_BYTES_BLOCK);
        #[allow(clippy::cast_possible_truncation)]
        bytes.extend_from_slice(&(length as u16).to_be_bytes());
        if length == 0 {
            break;
        }
        bytes.extend_from_slice(&rest[..length]);
        rest = &rest[length..];
    }
}

// Joins a split stream, returning the payload and the bytes following the
// terminator.
fn join_split(mut rdr: &[u8]) -> PvResult<(Vec<u8>, &[u8])> {
    let mut joined = Vec::new();
    loop {
        let length = rdr
            .read_u16::<BigEndian>()
            .map_err(|_| PvError::MalformedValue("split stream missing its terminator"))?
            as usize;
        if length == 0 {
            return Ok((joined, rdr));
        }
        if rdr.len() < length {
            return Err(PvError::MalformedValue("split stream truncated"));
        }
        joined.extend_from_slice(&rdr[..length]);
        rdr = &rdr[length..];
    }
}

fn join_text(payload: &[u8]) -> PvResult<String> {
    let (joined, _) = join_split(payload)?;
    String::from_utf8(joined).map_err(|_| PvError::MalformedValue("payload is not valid UTF-8"))
}

fn expect_width(payload: &[u8], width: usize) -> PvResult<()> {
    if payload.len() == width {
        Ok(())
    } else {
        Err(PvError::MalformedValue(
            "fixed-width payload has the wrong length",
        ))
    }
}

fn parse_long(text: &str) -> Option<i64> {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let magnitude = if let Some(hex) = digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        i64::from_str_radix(hex, 16).ok()?
    } else {
        digits.parse::<i64>().ok()?
    };
    Some(if negative { -magnitude } else { magnitude })
}

// State codes are read leniently: leading sign and digits, 0 when there
// are none.
fn parse_decimal_prefix(text: &str) -> i32 {
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(text)),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let magnitude = digits[..end].parse::<i32>().unwrap_or(0);
    if negative {
        -magnitude
    } else {
        magnitude
    }
}

#[cfg(test)]
mod tests {
    use super::{split_len, TypedValue, MAX_BYTES_BLOCK};
    use crate::store::ValueType;

    #[test]
    fn null_encodes_to_nothing() {
        let value = TypedValue::null();
        assert!(value.is_null());
        assert!(value.as_bytes().is_empty());
        assert!(TypedValue::from_bytes(Vec::new()).unwrap().is_null());
    }

    #[test]
    fn fixed_width_scalars_are_big_endian() {
        let value = TypedValue::from_long(0x0102_0304_0506_0708);
        assert_eq!(
            value.as_bytes(),
            [b'j', 1, 2, 3, 4, 5, 6, 7, 8]
        );
        assert_eq!(value.to_long().unwrap(), 0x0102_0304_0506_0708);

        let value = TypedValue::from_short(-2);
        assert_eq!(value.as_bytes(), [b's', 0xFF, 0xFE]);
        assert_eq!(value.to_long().unwrap(), -2);
    }

    #[test]
    fn short_strings_use_one_chunk_plus_terminator() {
        let value = TypedValue::from_string("ab");
        assert_eq!(value.as_bytes(), [b't', 0, 2, b'a', b'b', 0, 0]);
        assert_eq!(value.to_string_value().unwrap(), "ab");
    }

    #[test]
    fn a_full_block_gets_its_own_terminator() {
        let payload = vec![7_u8; MAX_BYTES_BLOCK];
        let value = TypedValue::from_byte_array(&payload);
        assert_eq!(value.as_bytes().len(), 1 + split_len(MAX_BYTES_BLOCK));
        assert_eq!(value.as_bytes().len(), 1 + 2 + MAX_BYTES_BLOCK + 2);
        assert_eq!(value.to_byte_array().unwrap(), payload);
    }

    #[test]
    fn numeric_coercions() {
        assert_eq!(TypedValue::from_double(1.5).to_double().unwrap(), 1.5);
        assert_eq!(TypedValue::from_float(0.5).to_double().unwrap(), 0.5);
        assert_eq!(TypedValue::from_double(1.9).to_long().unwrap(), 1);
        assert_eq!(TypedValue::from_boolean(true).to_long().unwrap(), 1);
        assert_eq!(TypedValue::from_byte(-1).to_long().unwrap(), -1);
        assert_eq!(TypedValue::from_string("42").to_long().unwrap(), 42);
        assert_eq!(TypedValue::from_string("0x10").to_long().unwrap(), 16);
        assert_eq!(TypedValue::from_string("7.5").to_double().unwrap(), 7.5);
        assert!(TypedValue::from_string("7x").to_long().is_err());
        assert!(TypedValue::from_boolean(true).to_double().is_err());
        assert!(TypedValue::from_character(b'A').to_long().is_err());
    }

    #[test]
    fn state_code_and_name() {
        let value = TypedValue::from_state(Some(42), Some("GOOD"));
        assert_eq!(value.state_code().unwrap(), 42);
        assert_eq!(value.state_name().unwrap().as_deref(), Some("GOOD"));

        let value = TypedValue::from_state(Some(42), None);
        assert_eq!(value.state_code().unwrap(), 42);
        assert_eq!(value.state_name().unwrap(), None);

        let value = TypedValue::from_state(None, Some("GOOD"));
        assert_eq!(value.state_code().unwrap(), 0);
        assert_eq!(value.state_name().unwrap().as_deref(), Some("GOOD"));

        // Non-state values coerce through the numeric path.
        assert_eq!(TypedValue::from_integer(7).state_code().unwrap(), 7);
        assert!(TypedValue::from_integer(7).state_name().is_err());
    }

    #[test]
    fn malformed_split_streams_are_decode_errors() {
        // Chain without a terminator.
        assert!(TypedValue::from_bytes(vec![b't', 0, 2, b'a', b'b']).is_err());
        // Truncated data.
        assert!(TypedValue::from_bytes(vec![b't', 0, 4, b'a']).is_err());
        // Trailing bytes.
        assert!(TypedValue::from_bytes(vec![b't', 0, 0, 9]).is_err());
        // Unknown type code.
        assert!(TypedValue::from_bytes(vec![b'?', 0, 0]).is_err());
        // Wrong scalar width.
        assert!(TypedValue::from_bytes(vec![b'j', 1, 2, 3]).is_err());
    }
}
