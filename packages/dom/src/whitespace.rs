//! Space handling for coalesced text.
//!
//! Rendering contexts collapse runs of plain spaces and drop spaces at the
//! edges of a block. Runs are rewritten so each space stays visible: plain
//! and non-breaking spaces alternate, and a space touching a block edge is
//! non-breaking. The output has exactly as many characters as the input, so
//! character spans stay valid.

pub const NBSP: char = '\u{a0}';

pub fn visible_spaces(text: &str, block_start: bool, block_end: bool) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != ' ' {
            out.push(chars[i]);
            i += 1;
            continue;
        }
        let start = i;
        while i < chars.len() && chars[i] == ' ' {
            i += 1;
        }
        let len = i - start;
        let leading = start == 0 && block_start;
        let trailing = i == chars.len() && block_end;
        for k in 0..len {
            // a leading run starts non-breaking so the first space survives
            let breaking = (k % 2 == 0) != leading;
            let breaking = breaking && !(trailing && k == len - 1);
            out.push(if breaking { ' ' } else { NBSP });
        }
    }
    out
}
