use rangecoder::{
    decode_symbol, encode_symbol, CoderConfig, DecoderStart, FrequencyTable, NonExcluding,
    QuasistaticModel, RangeDecoder, RangeEncoder, Side, SliceSource, WideTable,
};

fn open(bytes: &[u8], config: CoderConfig) -> (u8, RangeDecoder<SliceSource<'_>>) {
    match RangeDecoder::start(SliceSource::new(bytes), config).unwrap() {
        DecoderStart::Ready { header, decoder } => (header, decoder),
        DecoderStart::EndOfStream(_) => panic!("stream should not be empty"),
    }
}

#[test]
fn test_four_symbol_table_roundtrip() {
    let input = [0usize, 1, 0, 2, 0, 3, 0, 1];
    for config in [CoderConfig::EXACT, CoderConfig::FAST] {
        let mut model = WideTable::new(4, 64, 16).unwrap();
        assert_eq!(model.increment(), 2);
        let mut encoder = RangeEncoder::new(Vec::new(), 0, 0, config);
        for &s in &input {
            encode_symbol(&mut encoder, &mut model, s).unwrap();
        }
        let (_, stream) = encoder.finish().unwrap();

        let mut mirror = WideTable::new(4, 64, 16).unwrap();
        let (_, mut decoder) = open(&stream, config);
        let output: Vec<usize> = (0..input.len())
            .map(|_| decode_symbol(&mut decoder, &mut mirror).unwrap())
            .collect();
        decoder.finish().unwrap();

        assert_eq!(output, input);
        assert_eq!(model, mirror);
        let counts: Vec<u32> = (0..4).map(|s| mirror.count(s).unwrap()).collect();
        assert_eq!(counts, vec![9, 5, 3, 3]);
        assert_eq!(mirror.total(), 20);
    }
}

#[test]
fn test_four_symbol_narrow_table_roundtrip() {
    let input = [0usize, 1, 0, 2, 0, 3, 0, 1];
    let mut model = FrequencyTable::<u16, NonExcluding>::new(4, 64, 16).unwrap();
    let mut encoder = RangeEncoder::with_header(Vec::new(), 0);
    for &s in &input {
        encode_symbol(&mut encoder, &mut model, s).unwrap();
    }
    let (_, stream) = encoder.finish().unwrap();

    let mut mirror = FrequencyTable::<u16, NonExcluding>::new(4, 64, 16).unwrap();
    let (_, mut decoder) = open(&stream, CoderConfig::default());
    for &s in &input {
        assert_eq!(decode_symbol(&mut decoder, &mut mirror).unwrap(), s);
    }
    assert_eq!(model, mirror);
}

#[test]
fn test_raw_triples_recover_targets() {
    for config in [CoderConfig::EXACT, CoderConfig::FAST] {
        let mut encoder = RangeEncoder::new(Vec::new(), 0x00, 0, config);
        encoder.encode(1, 0, 4).unwrap();
        encoder.encode(1, 1, 4).unwrap();
        encoder.encode(2, 2, 4).unwrap();
        let (count, stream) = encoder.finish().unwrap();
        assert_eq!(count as usize, stream.len());
        assert_eq!(stream[0], 0x00);

        let (header, mut decoder) = open(&stream, config);
        assert_eq!(header, 0x00);
        assert_eq!(decoder.decode_target(4).unwrap(), 0);
        decoder.decode_commit(1, 0, 4).unwrap();
        assert_eq!(decoder.decode_target(4).unwrap(), 1);
        decoder.decode_commit(1, 1, 4).unwrap();
        let third = decoder.decode_target(4).unwrap();
        assert!((2..=3).contains(&third), "third target {third}");
        decoder.decode_commit(2, 2, 4).unwrap();
        decoder.finish().unwrap();
    }
}

#[test]
fn test_quasistatic_favours_frequent_symbol() {
    let mut model = QuasistaticModel::new(3, 4, 8, None, Side::Decompress).unwrap();
    let initial: Vec<u32> = (0..3).map(|s| model.query(s).unwrap().cum_freq).collect();
    assert_eq!(initial, vec![0, 6, 11]);

    for _ in 0..8 {
        model.update(0).unwrap();
    }
    let share: Vec<u32> = (0..3).map(|s| model.query(s).unwrap().freq).collect();
    assert_eq!(share.iter().sum::<u32>(), 16);
    assert!(share[0] > share[1]);
    assert!(share[0] > share[2]);
    assert_eq!(model.resolve(0).unwrap(), 0);
    assert_eq!(model.resolve(15).unwrap(), 2);
}
