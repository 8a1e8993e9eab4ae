use rangecoder::{
    decode_symbol, encode_symbol, DecoderStart, QuasistaticModel, RangeDecoder, RangeEncoder,
    Result, Side, SliceSource, WideTable,
};

fn main() -> Result<()> {
    let input = (0..100_000).map(|i| (i * 7 % 13) % 5).collect::<Vec<usize>>();

    for _ in 0..100 {
        let mut table = WideTable::new(5, 1 << 12, 32)?;
        let mut qs = QuasistaticModel::new(5, 12, 256, None, Side::Compress)?;
        let mut encoder = RangeEncoder::with_header(Vec::new(), 0);
        for &s in &input {
            encode_symbol(&mut encoder, &mut table, s)?;
            encode_symbol(&mut encoder, &mut qs, 4 - s)?;
        }
        let (_, stream) = encoder.finish()?;

        let mut table = WideTable::new(5, 1 << 12, 32)?;
        let mut qs = QuasistaticModel::new(5, 12, 256, None, Side::Decompress)?;
        let DecoderStart::Ready { mut decoder, .. } =
            RangeDecoder::start(SliceSource::new(&stream), Default::default())?
        else {
            return Ok(());
        };
        for _ in 0..input.len() {
            decode_symbol(&mut decoder, &mut table)?;
            decode_symbol(&mut decoder, &mut qs)?;
        }
        decoder.finish()?;
    }
    Ok(())
}
