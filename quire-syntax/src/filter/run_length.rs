use crate::byte_reader::Reader;
use log::warn;

pub(crate) fn decode(data: &[u8]) -> Option<Vec<u8>> {
    let mut reader = Reader::new(data);
    let mut decoded = vec![];

    if decode_inner(&mut reader, &mut decoded).is_none() {
        warn!("run-length decode stream ended prematurely");
    }

    Some(decoded)
}

fn decode_inner(reader: &mut Reader<'_>, decoded: &mut Vec<u8>) -> Option<()> {
    loop {
        let length = reader.read_byte()?;

        match length {
            128 => return Some(()),
            0..=127 => decoded.extend(reader.read_bytes(usize::from(length) + 1)?),
            _ => {
                let length = 257 - usize::from(length);
                decoded.extend([reader.read_byte()?].repeat(length));
            }
        }
    }
}

/// Encode runs of up to 128 equal bytes, everything else as literal blocks.
pub(crate) fn encode(data: &[u8]) -> Vec<u8> {
    let mut encoded = Vec::with_capacity(data.len() + data.len() / 128 + 2);
    let mut literal_start = 0;
    let mut i = 0;

    while i < data.len() {
        let run = data[i..]
            .iter()
            .take(128)
            .take_while(|&&b| b == data[i])
            .count();

        if run >= 2 {
            flush_literal(&mut encoded, &data[literal_start..i]);
            encoded.push((257 - run) as u8);
            encoded.push(data[i]);
            i += run;
            literal_start = i;
        } else {
            i += 1;

            if i - literal_start == 128 {
                flush_literal(&mut encoded, &data[literal_start..i]);
                literal_start = i;
            }
        }
    }

    flush_literal(&mut encoded, &data[literal_start..]);
    encoded.push(128);

    encoded
}

fn flush_literal(out: &mut Vec<u8>, literal: &[u8]) {
    if !literal.is_empty() {
        out.push((literal.len() - 1) as u8);
        out.extend_from_slice(literal);
    }
}

#[cfg(test)]
mod tests {
    use crate::filter::run_length::{decode, encode};

    #[test]
    fn run_length() {
        let input = vec![4, 10, 11, 12, 13, 14, 253, 3, 128];
        assert_eq!(decode(&input).unwrap(), vec![10, 11, 12, 13, 14, 3, 3, 3, 3]);
    }

    #[test]
    fn truncated() {
        assert_eq!(decode(&[2, 1, 2]).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn encode_runs_and_literals() {
        let data = [10, 11, 12, 13, 14, 3, 3, 3, 3];
        assert_eq!(encode(&data), vec![4, 10, 11, 12, 13, 14, 253, 3, 128]);
    }

    #[test]
    fn encode_long_run() {
        let data = [7_u8; 300];
        assert_eq!(decode(&encode(&data)).unwrap(), data);
    }
}
