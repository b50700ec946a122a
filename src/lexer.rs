/// One logical script line with separators and comments removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    pub number: usize,
    pub text: String,
}

/// Saved reader position, see [`LineReader::mark`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mark {
    pos: usize,
    line: usize,
}

/// Splits a fully buffered script into stripped lines. The buffer is kept
/// whole so that the switch priming pass can rewind and read a block twice.
pub struct LineReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    line: usize,
}

impl<'a> LineReader<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            bytes: source.as_bytes(),
            pos: 0,
            line: 0,
        }
    }

    pub fn is_eof(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn mark(&self) -> Mark {
        Mark {
            pos: self.pos,
            line: self.line,
        }
    }

    pub fn seek(&mut self, mark: Mark) {
        self.pos = mark.pos;
        self.line = mark.line;
    }

    pub fn next_line(&mut self) -> Option<SourceLine> {
        if self.is_eof() {
            return None;
        }

        let mut text: Vec<u8> = Vec::new();
        let mut in_string = false;
        let mut comment = false;

        while let Some(&ch) = self.bytes.get(self.pos) {
            self.pos += 1;
            match ch {
                b'\n' => break,
                b'\r' => {}
                _ if comment => {}
                b'"' => {
                    in_string = !in_string;
                    text.push(ch);
                }
                _ if in_string => text.push(ch),
                b' ' | b'\t' | b';' => {}
                b'/' if text.last() == Some(&b'/') => {
                    text.pop();
                    comment = true;
                }
                _ => text.push(ch),
            }
        }

        self.line += 1;
        Some(SourceLine {
            number: self.line,
            text: String::from_utf8_lossy(&text).into_owned(),
        })
    }
}

impl Iterator for LineReader<'_> {
    type Item = SourceLine;

    fn next(&mut self) -> Option<SourceLine> {
        self.next_line()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(source: &str) -> Vec<String> {
        LineReader::new(source).map(|l| l.text).collect()
    }

    #[test]
    fn strips_separators_outside_strings() {
        assert_eq!(
            texts("  Object.XPos += 0x10000;\r\n\tDrawSprite( 0 )\n"),
            vec!["Object.XPos+=0x10000", "DrawSprite(0)"]
        );
    }

    #[test]
    fn comments_end_the_line_but_not_inside_strings() {
        assert_eq!(
            texts("TempValue0 = 1 // set\nLoadSpriteSheet(\"a // b.gif\") // c"),
            vec!["TempValue0=1", "LoadSpriteSheet(\"a // b.gif\")"]
        );
    }

    #[test]
    fn line_numbers_are_one_based_and_count_blank_lines() {
        let lines: Vec<SourceLine> = LineReader::new("a\n\nb").collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].number, 1);
        assert_eq!(lines[1].text, "");
        assert_eq!(lines[2].number, 3);
    }

    #[test]
    fn seek_replays_lines() {
        let mut reader = LineReader::new("one\ntwo\nthree\n");
        reader.next_line();
        let mark = reader.mark();
        assert_eq!(reader.next_line().map(|l| l.text), Some("two".into()));
        assert_eq!(reader.next_line().map(|l| l.number), Some(3));
        reader.seek(mark);
        let again = reader.next_line().unwrap();
        assert_eq!((again.number, again.text.as_str()), (2, "two"));
    }
}
