//! A small run-length coder built on the public API, exercising the
//! `RunCoder` contract end to end.

use rangecoder::{
    decode_symbol, encode_symbol, DecoderStart, Error, Mode, QuasistaticModel, RangeDecoder,
    RangeEncoder, Result, RunCoder, WideTable,
};

type Source = std::vec::IntoIter<u8>;

/// Bytes through a quasistatic model, run lengths as a bit-length class from
/// a Fenwick table followed by the raw bits below the leading one.
struct RleCoder {
    symbols: QuasistaticModel,
    classes: WideTable,
    encoder: Option<RangeEncoder<Vec<u8>>>,
    decoder: Option<RangeDecoder<Source>>,
    output: Vec<u8>,
}

impl RleCoder {
    /// `stream` is required when decompressing. Returns `None` for an empty
    /// stream.
    fn open(mode: Mode, stream: Option<Vec<u8>>) -> Result<Option<Self>> {
        let mut coder = Self {
            symbols: QuasistaticModel::new(256, 12, 256, None, mode.into())?,
            classes: WideTable::new(33, 1 << 13, 32)?,
            encoder: None,
            decoder: None,
            output: Vec::new(),
        };
        match mode {
            Mode::Compress => coder.encoder = Some(RangeEncoder::with_header(Vec::new(), 0xC5)),
            Mode::Decompress => {
                let stream = stream.ok_or(Error::InvalidParameter("no stream to decode"))?;
                match RangeDecoder::start(stream.into_iter(), Default::default())? {
                    DecoderStart::Ready { header, decoder } => {
                        assert_eq!(header, 0xC5);
                        coder.decoder = Some(decoder);
                    }
                    DecoderStart::EndOfStream(_) => return Ok(None),
                }
            }
        }
        Ok(Some(coder))
    }

    fn take_output(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.output)
    }
}

impl RunCoder for RleCoder {
    fn encode_run(&mut self, symbol: u8, run_length: u32) -> Result<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or(Error::InvalidParameter("not compressing"))?;
        encode_symbol(encoder, &mut self.symbols, usize::from(symbol))?;
        let class = 32 - run_length.leading_zeros();
        encode_symbol(encoder, &mut self.classes, class as usize)?;
        if class > 1 {
            let extra = class - 1;
            let rest = run_length & ((1 << extra) - 1);
            let low = extra.min(16);
            encoder.encode_shift(1, rest & ((1 << low) - 1), low)?;
            if extra > 16 {
                encoder.encode_shift(1, rest >> 16, extra - 16)?;
            }
        }
        Ok(())
    }

    fn decode_run(&mut self) -> Result<(u8, u32)> {
        let decoder = self
            .decoder
            .as_mut()
            .ok_or(Error::InvalidParameter("not decompressing"))?;
        let symbol = decode_symbol(decoder, &mut self.symbols)? as u8;
        let class = decode_symbol(decoder, &mut self.classes)? as u32;
        let run_length = match class {
            0 => 0,
            1 => 1,
            _ => {
                let extra = class - 1;
                let low = extra.min(16);
                let mut rest = decoder.decode_target_shift(low)?;
                decoder.decode_commit_shift(1, rest, low)?;
                if extra > 16 {
                    let high = decoder.decode_target_shift(extra - 16)?;
                    decoder.decode_commit_shift(1, high, extra - 16)?;
                    rest |= high << 16;
                }
                (1 << extra) | rest
            }
        };
        Ok((symbol, run_length))
    }

    fn finalize(&mut self) -> Result<u32> {
        if let Some(encoder) = self.encoder.take() {
            let (count, bytes) = encoder.finish()?;
            self.output = bytes;
            return Ok(count);
        }
        if let Some(decoder) = self.decoder.take() {
            decoder.finish()?;
            return Ok(0);
        }
        Err(Error::InvalidParameter("already finalized"))
    }
}

fn runs_of(data: &[u8]) -> Vec<(u8, u32)> {
    let mut runs: Vec<(u8, u32)> = Vec::new();
    for &b in data {
        match runs.last_mut() {
            Some((sym, len)) if *sym == b => *len += 1,
            _ => runs.push((b, 1)),
        }
    }
    runs
}

fn compress(runs: &[(u8, u32)]) -> (u32, Vec<u8>) {
    let mut coder = RleCoder::open(Mode::Compress, None).unwrap().unwrap();
    for &(symbol, len) in runs {
        coder.encode_run(symbol, len).unwrap();
    }
    let count = coder.finalize().unwrap();
    (count, coder.take_output())
}

#[test]
fn test_text_runs_roundtrip() {
    let text = b"aaaabbbcccccccccccd  eeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeeffg".repeat(20);
    let runs = runs_of(&text);
    let (count, stream) = compress(&runs);
    assert_eq!(count as usize, stream.len());
    assert!(stream.len() < text.len());

    let mut coder = RleCoder::open(Mode::Decompress, Some(stream))
        .unwrap()
        .unwrap();
    let decoded: Vec<(u8, u32)> = (0..runs.len())
        .map(|_| coder.decode_run().unwrap())
        .collect();
    assert_eq!(decoded, runs);
    assert_eq!(coder.finalize().unwrap(), 0);
}

#[test]
fn test_extreme_run_lengths() {
    let runs = vec![
        (0u8, 0u32),
        (1, 1),
        (2, 2),
        (3, 65_535),
        (4, 65_536),
        (5, 1 << 20),
        (6, u32::MAX),
        (255, 123_456_789),
    ];
    let (_, stream) = compress(&runs);
    let mut coder = RleCoder::open(Mode::Decompress, Some(stream))
        .unwrap()
        .unwrap();
    for &want in &runs {
        assert_eq!(coder.decode_run().unwrap(), want);
    }
    coder.finalize().unwrap();
}

#[test]
fn test_wrong_direction_and_double_finalize() {
    let mut coder = RleCoder::open(Mode::Compress, None).unwrap().unwrap();
    assert!(matches!(
        coder.decode_run(),
        Err(Error::InvalidParameter(_))
    ));
    coder.finalize().unwrap();
    assert!(matches!(coder.finalize(), Err(Error::InvalidParameter(_))));
    assert!(matches!(
        coder.encode_run(1, 1),
        Err(Error::InvalidParameter(_))
    ));
}

#[test]
fn test_empty_stream_is_end_of_stream() {
    assert!(RleCoder::open(Mode::Decompress, Some(Vec::new()))
        .unwrap()
        .is_none());
    assert!(matches!(
        RleCoder::open(Mode::Decompress, None),
        Err(Error::InvalidParameter(_))
    ));
}
