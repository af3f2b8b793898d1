//! A tiny TrueType font assembled byte by byte.
//!
//! Glyphs are `.notdef A V acutecomb`, mapped from U+0041, U+0056 and
//! U+0301. A and V are plain rectangles.

#[derive(Default)]
struct BeBuffer(Vec<u8>);

impl BeBuffer {
    fn u8(mut self, value: u8) -> Self {
        self.0.push(value);
        self
    }

    fn u16(mut self, value: u16) -> Self {
        self.0.extend(value.to_be_bytes());
        self
    }

    fn i16(mut self, value: i16) -> Self {
        self.0.extend(value.to_be_bytes());
        self
    }

    fn u32(mut self, value: u32) -> Self {
        self.0.extend(value.to_be_bytes());
        self
    }

    fn tag(mut self, tag: &[u8; 4]) -> Self {
        self.0.extend(tag);
        self
    }

    fn bytes(mut self, bytes: &[u8]) -> Self {
        self.0.extend(bytes);
        self
    }

    fn u16s(self, values: &[u16]) -> Self {
        values.iter().fold(self, |buf, v| buf.u16(*v))
    }

    fn i16s(self, values: &[i16]) -> Self {
        values.iter().fold(self, |buf, v| buf.i16(*v))
    }
}

/// Knobs for producing two slightly different builds.
#[derive(Clone, Debug)]
pub(crate) struct TestFont {
    pub units_per_em: u16,
    pub kern_av: i16,
    /// Right edge of the V rectangle.
    pub v_x_max: i16,
    pub mark_x: i16,
    pub family: &'static str,
}

impl Default for TestFont {
    fn default() -> Self {
        Self {
            units_per_em: 1000,
            kern_av: -80,
            v_x_max: 550,
            mark_x: 150,
            family: "Skillnad Test",
        }
    }
}

impl TestFont {
    pub fn build(&self) -> Vec<u8> {
        assemble(vec![
            (*b"GDEF", gdef()),
            (*b"GPOS", self.gpos()),
            (*b"GSUB", gsub()),
            (*b"OS/2", os2()),
            (*b"cmap", cmap()),
            (*b"glyf", self.glyf()),
            (*b"head", self.head()),
            (*b"hhea", hhea()),
            (*b"hmtx", hmtx()),
            (*b"kern", kern()),
            (*b"loca", loca()),
            (*b"maxp", maxp()),
            (*b"name", self.name()),
            (*b"post", post()),
        ])
    }

    fn head(&self) -> Vec<u8> {
        BeBuffer::default()
            .u16s(&[1, 0])
            .u32(0x0001_8000) // fontRevision 1.5
            .u32(0)
            .u32(0x5F0F_3CF5)
            .u16(3)
            .u16(self.units_per_em)
            .u32(0)
            .u32(0xD5E8_4F00) // created
            .u32(0)
            .u32(0xD5E8_4F00) // modified
            .i16s(&[0, 0, 550, 700])
            .u16(0) // macStyle
            .u16(8) // lowestRecPPEM
            .i16s(&[2, 0, 0])
            .0
    }

    fn glyf(&self) -> Vec<u8> {
        let mut data = rectangle(100, 500);
        data.extend(rectangle(50, self.v_x_max));
        data
    }

    fn name(&self) -> Vec<u8> {
        let strings = [(1, self.family), (2, "Regular")];
        let mut header = BeBuffer::default().u16s(&[0, strings.len() as u16, 6 + 12 * strings.len() as u16]);
        let mut storage = Vec::new();
        for (name_id, string) in strings {
            let encoded: Vec<u8> = string.encode_utf16().flat_map(u16::to_be_bytes).collect();
            header = header.u16s(&[3, 1, 0x409, name_id, encoded.len() as u16, storage.len() as u16]);
            storage.extend(encoded);
        }
        header.bytes(&storage).0
    }

    fn gpos(&self) -> Vec<u8> {
        BeBuffer::default()
            // header
            .u16s(&[1, 0, 10, 32, 58])
            // script list, DFLT with both features
            .u16(1)
            .tag(b"DFLT")
            .u16(8)
            .u16s(&[4, 0])
            .u16s(&[0, 0xFFFF, 2, 0, 1])
            // feature list
            .u16(2)
            .tag(b"kern")
            .u16(14)
            .tag(b"mark")
            .u16(20)
            .u16s(&[0, 1, 0])
            .u16s(&[0, 1, 1])
            // lookup list
            .u16s(&[2, 6, 38])
            // lookup 0: pair adjustment A V
            .u16s(&[2, 0, 1, 8])
            .u16s(&[1, 18, 0x0004, 0, 1, 12])
            .u16s(&[1, 2])
            .i16(self.kern_av)
            .u16s(&[1, 1, 1])
            // lookup 1: acutecomb on A
            .u16s(&[4, 0, 1, 8])
            .u16s(&[1, 12, 18, 1, 24, 36])
            .u16s(&[1, 1, 3])
            .u16s(&[1, 1, 1])
            .u16s(&[1, 0, 6])
            .u16(1)
            .i16s(&[self.mark_x, -10])
            .u16s(&[1, 4])
            .u16(1)
            .i16s(&[300, 700])
            .0
    }
}

/// A one contour glyph spanning `x_min..x_max` and `0..700`.
fn rectangle(x_min: i16, x_max: i16) -> Vec<u8> {
    BeBuffer::default()
        .i16(1)
        .i16s(&[x_min, 0, x_max, 700])
        .u16(3)
        .u16(0)
        .u8(1)
        .u8(1)
        .u8(1)
        .u8(1)
        .i16s(&[x_min, 0, x_max - x_min, 0])
        .i16s(&[0, 700, 0, -700])
        .0
}

fn loca() -> Vec<u8> {
    BeBuffer::default().u16s(&[0, 0, 17, 34, 34]).0
}

fn hhea() -> Vec<u8> {
    BeBuffer::default()
        .u16s(&[1, 0])
        .i16s(&[800, -200, 0])
        .u16(600)
        .i16s(&[0, 0, 550, 1, 0, 0, 0, 0, 0, 0, 0])
        .u16(4)
        .0
}

fn hmtx() -> Vec<u8> {
    BeBuffer::default()
        .u16(500)
        .i16(0)
        .u16(600)
        .i16(100)
        .u16(600)
        .i16(50)
        .u16(0)
        .i16(0)
        .0
}

fn maxp() -> Vec<u8> {
    BeBuffer::default()
        .u32(0x0001_0000)
        .u16s(&[4, 4, 1, 0, 0, 2, 0, 0, 0, 0, 0, 0, 0, 0])
        .0
}

fn cmap() -> Vec<u8> {
    BeBuffer::default()
        .u16s(&[0, 1])
        .u16s(&[3, 1])
        .u32(12)
        // format 4, four segments
        .u16s(&[4, 48, 0, 8, 8, 2, 0])
        .u16s(&[0x41, 0x56, 0x301, 0xFFFF])
        .u16(0)
        .u16s(&[0x41, 0x56, 0x301, 0xFFFF])
        .i16s(&[1 - 0x41, 2 - 0x56, 3 - 0x301, 1])
        .u16s(&[0, 0, 0, 0])
        .0
}

fn os2() -> Vec<u8> {
    BeBuffer::default()
        .u16(4)
        .i16(500)
        .u16s(&[400, 5, 0])
        .i16s(&[650, 600, 0, 75, 650, 600, 0, 350, 50, 250, 0])
        .bytes(&[2, 0, 5, 3, 0, 0, 0, 0, 0, 0])
        .u32(1)
        .u32(0)
        .u32(0)
        .u32(0)
        .tag(b"NONE")
        .u16(0x40)
        .u16s(&[0x41, 0x301])
        .i16s(&[800, -200, 0])
        .u16s(&[800, 200])
        .u32(1)
        .u32(0)
        .i16s(&[500, 700])
        .u16s(&[0, 0x20, 2])
        .0
}

fn post() -> Vec<u8> {
    let mut buf = BeBuffer::default()
        .u32(0x0002_0000)
        .u32(0)
        .i16s(&[-100, 50])
        .u32(0)
        .u32(0)
        .u32(0)
        .u32(0)
        .u32(0)
        .u16(4)
        .u16s(&[0, 258, 259, 260]);
    for name in ["A", "V", "acutecomb"] {
        buf = buf.u8(name.len() as u8).bytes(name.as_bytes());
    }
    buf.0
}

fn gdef() -> Vec<u8> {
    BeBuffer::default()
        .u16s(&[1, 0, 12, 0, 0, 0])
        .u16s(&[1, 1, 3, 1, 1, 3])
        .0
}

fn gsub() -> Vec<u8> {
    BeBuffer::default()
        .u16s(&[1, 0, 10, 30, 44])
        .u16(1)
        .tag(b"DFLT")
        .u16(8)
        .u16s(&[4, 0])
        .u16s(&[0, 0xFFFF, 1, 0])
        .u16(1)
        .tag(b"salt")
        .u16(8)
        .u16s(&[0, 1, 0])
        .u16s(&[1, 4])
        .u16s(&[1, 0, 1, 8])
        // single substitution A -> V
        .u16s(&[2, 8, 1, 2])
        .u16s(&[1, 1, 1])
        .0
}

fn kern() -> Vec<u8> {
    BeBuffer::default()
        .u16s(&[0, 2])
        // horizontal V A -40
        .u16s(&[0, 20, 0x0001])
        .u16s(&[1, 6, 0, 0])
        .u16s(&[2, 1])
        .i16(-40)
        // vertical A V -999
        .u16s(&[0, 20, 0x0000])
        .u16s(&[1, 6, 0, 0])
        .u16s(&[1, 2])
        .i16(-999)
        .0
}

fn assemble(mut tables: Vec<([u8; 4], Vec<u8>)>) -> Vec<u8> {
    tables.sort_by(|a, b| a.0.cmp(&b.0));
    let num_tables = tables.len() as u16;
    let entry_selector = 15 - num_tables.leading_zeros() as u16;
    let search_range = 16 << entry_selector;
    let mut directory = BeBuffer::default()
        .u32(0x0001_0000)
        .u16s(&[num_tables, search_range, entry_selector, num_tables * 16 - search_range]);
    let mut offset = 12 + 16 * tables.len();
    let mut body = Vec::new();
    for (tag, data) in &tables {
        directory = directory
            .tag(tag)
            .u32(0)
            .u32(offset as u32)
            .u32(data.len() as u32);
        body.extend(data);
        while body.len() % 4 != 0 {
            body.push(0);
        }
        offset = 12 + 16 * tables.len() + body.len();
    }
    directory.bytes(&body).0
}
