/// Little-endian cursor over a persisted attribute blob. Every read returns
/// `None` once the blob is exhausted and leaves the cursor where it was.
#[derive(Debug, Clone)]
pub struct PropReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PropReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    pub fn read_u8(&mut self) -> Option<u8> {
        let value = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(value)
    }

    pub fn read_u16(&mut self) -> Option<u16> {
        let bytes = self.read_array::<2>()?;
        Some(u16::from_le_bytes(bytes))
    }

    pub fn read_u32(&mut self) -> Option<u32> {
        let bytes = self.read_array::<4>()?;
        Some(u32::from_le_bytes(bytes))
    }

    pub fn read_i32(&mut self) -> Option<i32> {
        let bytes = self.read_array::<4>()?;
        Some(i32::from_le_bytes(bytes))
    }

    /// u16 length followed by the raw bytes. Invalid UTF-8 is replaced
    /// rather than rejected; old saves were written in Latin-1.
    pub fn read_string(&mut self) -> Option<String> {
        let start = self.pos;
        let len = self.read_u16()? as usize;
        match self.read_bytes(len) {
            Some(bytes) => Some(String::from_utf8_lossy(bytes).into_owned()),
            None => {
                self.pos = start;
                None
            }
        }
    }

    pub fn read_bytes(&mut self, len: usize) -> Option<&'a [u8]> {
        if self.remaining() < len {
            return None;
        }
        let start = self.pos;
        self.pos += len;
        Some(&self.data[start..start + len])
    }

    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Some(out)
    }
}

#[derive(Debug, Default, Clone)]
pub struct PropWriter {
    data: Vec<u8>,
}

impl PropWriter {
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    pub fn write_u8(&mut self, value: u8) {
        self.data.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.data.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes a u16-length string. Longer strings are cut at the limit,
    /// backing off to a char boundary.
    pub fn write_string(&mut self, value: &str) {
        let mut end = value.len().min(usize::from(u16::MAX));
        while !value.is_char_boundary(end) {
            end -= 1;
        }
        let bytes = &value.as_bytes()[..end];
        self.write_u16(bytes.len() as u16);
        self.data.extend_from_slice(bytes);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lcg_next(state: &mut u64) -> u32 {
        *state = state.wrapping_mul(6364136223846793005).wrapping_add(1);
        (*state >> 32) as u32
    }

    #[test]
    fn strings_of_varied_length_read_back() {
        let mut state = 0x0bad_cafe_dead_beef;
        let mut writer = PropWriter::new();
        let mut expected = Vec::new();
        for _ in 0..64 {
            let len = (lcg_next(&mut state) % 300) as usize;
            let text: String = (0..len)
                .map(|_| char::from(b'a' + (lcg_next(&mut state) % 26) as u8))
                .collect();
            writer.write_string(&text);
            expected.push(text);
        }
        let mut reader = PropReader::new(writer.as_slice());
        for text in expected {
            assert_eq!(reader.read_string().expect("string"), text);
        }
        assert_eq!(reader.remaining(), 0);
    }

    #[test]
    fn truncated_reads_fail_without_consuming() {
        let mut writer = PropWriter::new();
        writer.write_u16(10);
        writer.write_bytes(b"abc");
        let mut reader = PropReader::new(writer.as_slice());
        assert!(reader.read_string().is_none());
        assert_eq!(reader.position(), 0);
        assert!(reader.read_u32().is_some());
        assert!(reader.read_u32().is_none());
        assert_eq!(reader.read_u8(), Some(b'c'));
        assert!(reader.read_u8().is_none());
    }

    #[test]
    fn oversized_string_is_cut_on_char_boundary() {
        let text = "\u{e9}".repeat(40_000);
        let mut writer = PropWriter::new();
        writer.write_string(&text);
        let mut reader = PropReader::new(writer.as_slice());
        let decoded = reader.read_string().expect("string");
        assert_eq!(decoded.len(), 65_534);
        assert!(decoded.chars().all(|ch| ch == '\u{e9}'));
    }
}
