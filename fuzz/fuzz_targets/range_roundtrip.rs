#![no_main]
use libfuzzer_sys::fuzz_target;
use rangecoder::{
    decode_symbol, encode_symbol, CoderConfig, DecoderStart, RangeDecoder, RangeEncoder,
    SliceSource, WideTable,
};

fuzz_target!(|data: (Vec<u8>, u32, bool)| {
    let (input_bytes, interval, fast) = data;
    if input_bytes.is_empty() {
        return;
    }
    let interval = interval % 1024 + 1;
    let config = if fast {
        CoderConfig::FAST
    } else {
        CoderConfig::EXACT
    };
    let input: Vec<usize> = input_bytes.iter().map(|&b| usize::from(b)).collect();

    let mut model = WideTable::new(256, 1 << 16, interval).unwrap();
    let mut encoder = RangeEncoder::new(Vec::new(), 0, 0, config);
    for &s in &input {
        encode_symbol(&mut encoder, &mut model, s).unwrap();
    }
    let (count, stream) = encoder.finish().unwrap();
    assert_eq!(count as usize, stream.len());

    let mut mirror = WideTable::new(256, 1 << 16, interval).unwrap();
    let mut decoder = match RangeDecoder::start(SliceSource::new(&stream), config).unwrap() {
        DecoderStart::Ready { decoder, .. } => decoder,
        DecoderStart::EndOfStream(_) => panic!("finished stream is never empty"),
    };
    let mut output = Vec::with_capacity(input.len());
    for _ in 0..input.len() {
        output.push(decode_symbol(&mut decoder, &mut mirror).unwrap());
    }
    let rest = decoder.finish().unwrap();

    assert_eq!(input, output);
    assert!(rest.remaining().is_empty());
});
