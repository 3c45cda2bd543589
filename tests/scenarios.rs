//! Integration tests over the full encode pipeline (events -> scheduler ->
//! packets) and the full decode pipeline (packets -> framebuffer -> RGB),
//! covering the six concrete scenarios this crate is specified against.
//! Grounded in `rustvnc-rfb-encodings`'s `tests/golden_tests.rs` /
//! `tests/decoders.rs` split between encoder-output assertions and
//! decoded-framebuffer assertions.

use cdg_author::bitmap::Bitmap;
use cdg_author::bmp;
use cdg_author::decoder::Decoder;
use cdg_author::error::CdgError;
use cdg_author::palette::{Palette, Rgba};
use cdg_author::packet::{self, INSTR_COPY_FONT, INSTR_XOR_FONT};
use cdg_author::scheduler::{schedule, SchedulerConfig, SchedulerInput};
use cdg_author::timeline::{Event, EventTimeline, Payload, NO_PRESET};
use cdg_author::writer;

fn ramp_palette() -> Palette {
    let mut p = Palette::new();
    for i in 0..16u8 {
        p.set(i, Rgba::rgb(i * 16, i * 8, 255 - i * 16)).unwrap();
    }
    p
}

fn clear_event(start: u32, duration: u32, track: u8) -> Event {
    Event {
        start_offset_packs: start,
        duration_packs: duration,
        payload: Payload::Clear,
        border_index: NO_PRESET,
        memory_preset_index: NO_PRESET,
        track,
        channel: 0,
        label: None,
    }
}

#[test]
fn scenario_1_empty_project_four_seconds() {
    let timeline = EventTimeline::new();
    let palette = ramp_palette();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs: 1200,
        initial_palette: &palette,
        initial_border: 0,
        initial_clear_color: 0,
        initial_transparent: 0,
    };
    let packets = schedule(&input, &SchedulerConfig::default()).unwrap();
    assert_eq!(packets.len(), 1200);
    assert!(packets[..5].iter().all(|p| !p.is_empty()));
    assert!(packets[5..].iter().all(|p| p.is_empty()));

    let bytes = writer::to_bytes(&packets);
    assert_eq!(bytes.len(), 1200 * packet::PACKET_LEN);
    assert_eq!(bytes.len(), 24000);
}

#[test]
fn scenario_2_single_uniform_tile() {
    let mut timeline = EventTimeline::new();
    let bitmap = Bitmap::new(6, 12, vec![7; 72], [Rgba::default(); 256]).with_offset(60, 60);
    timeline
        .insert(Event {
            start_offset_packs: 300,
            duration_packs: 300,
            payload: Payload::Bitmap(bitmap),
            border_index: NO_PRESET,
            memory_preset_index: NO_PRESET,
            track: 0,
            channel: 0,
            label: Some("uniform-tile".into()),
        })
        .unwrap();

    let palette = ramp_palette();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs: 1200,
        initial_palette: &palette,
        initial_border: 0,
        initial_clear_color: 0,
        initial_transparent: 0,
    };
    let packets = schedule(&input, &SchedulerConfig::default()).unwrap();

    let non_empty: Vec<_> = packets[300..600]
        .iter()
        .filter(|p| !p.is_empty())
        .collect();
    assert_eq!(non_empty.len(), 1);
    assert_eq!(non_empty[0].instruction(), INSTR_COPY_FONT);
    let (c0, c1, row, col, masks) = non_empty[0].tile_payload();
    assert_eq!((c0, c1, row, col), (7, 7, 5, 10));
    assert_eq!(masks, [0x3F; 12]);
    assert!(packets[..300].iter().skip(5).all(|p| p.is_empty()));
    assert!(packets[600..].iter().all(|p| p.is_empty()));
}

#[test]
fn scenario_3_two_color_diagonal_round_trips_through_decoder() {
    let mut pixels = vec![0u8; 72];
    for y in 0..12usize {
        for x in 0..6usize {
            pixels[y * 6 + x] = if x == y % 6 { 2 } else { 5 };
        }
    }
    let mut timeline = EventTimeline::new();
    let bitmap = Bitmap::new(6, 12, pixels, [Rgba::default(); 256]).with_offset(0, 0);
    timeline
        .insert(Event {
            start_offset_packs: 5,
            duration_packs: 50,
            payload: Payload::Bitmap(bitmap),
            border_index: NO_PRESET,
            memory_preset_index: NO_PRESET,
            track: 0,
            channel: 0,
            label: Some("diagonal".into()),
        })
        .unwrap();

    let palette = ramp_palette();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs: 100,
        initial_palette: &palette,
        initial_border: 0,
        initial_clear_color: 0,
        initial_transparent: 0,
    };
    let packets = schedule(&input, &SchedulerConfig::default()).unwrap();

    let mut decoder = Decoder::new();
    for p in &packets {
        decoder.apply(p);
    }
    let decoded = decoder.read_tile(0, 0);
    for y in 0..12usize {
        for x in 0..6usize {
            let expected: u16 = if x == y % 6 { 2 } else { 5 };
            assert_eq!(decoded.get(x, y), expected);
        }
    }
}

#[test]
fn scenario_4_three_color_l_shape_two_packets() {
    let mut flat = [1u16; 72];
    for slot in flat.iter_mut().skip(40).take(20) {
        *slot = 2;
    }
    for slot in flat.iter_mut().skip(60) {
        *slot = 3;
    }
    let pixels: Vec<u8> = flat.iter().map(|&v| v as u8).collect();

    let mut timeline = EventTimeline::new();
    let bitmap = Bitmap::new(6, 12, pixels, [Rgba::default(); 256]).with_offset(0, 0);
    timeline
        .insert(Event {
            start_offset_packs: 0,
            duration_packs: 20,
            payload: Payload::Bitmap(bitmap),
            border_index: NO_PRESET,
            memory_preset_index: NO_PRESET,
            track: 0,
            channel: 0,
            label: Some("l-shape".into()),
        })
        .unwrap();

    let palette = ramp_palette();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs: 50,
        initial_palette: &palette,
        initial_border: 0,
        initial_clear_color: 0,
        initial_transparent: 0,
    };
    let packets = schedule(&input, &SchedulerConfig::default()).unwrap();
    let non_empty: Vec<_> = packets[5..].iter().filter(|p| !p.is_empty()).collect();
    assert_eq!(non_empty.len(), 2);
    assert_eq!(non_empty[0].instruction(), INSTR_COPY_FONT);
    assert_eq!(non_empty[1].instruction(), INSTR_XOR_FONT);
}

#[test]
fn scenario_5_overbudget_detection() {
    let mut timeline = EventTimeline::new();
    for i in 0..8u8 {
        let mut pixels = vec![0u8; 300 * 216];
        for (j, p) in pixels.iter_mut().enumerate() {
            *p = ((j + i as usize) % 15) as u8 + 1;
        }
        let bitmap = Bitmap::new(300, 216, pixels, [Rgba::default(); 256]).with_offset(0, 0);
        timeline
            .insert(Event {
                start_offset_packs: 0,
                duration_packs: 1000,
                payload: Payload::Bitmap(bitmap),
                border_index: NO_PRESET,
                memory_preset_index: NO_PRESET,
                track: i,
                channel: 0,
                label: Some(format!("overload-{i}")),
            })
            .unwrap();
    }

    let palette = ramp_palette();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs: 1000,
        initial_palette: &palette,
        initial_border: 0,
        initial_clear_color: 0,
        initial_transparent: 0,
    };
    let err = schedule(
        &input,
        &SchedulerConfig {
            pack_budget_per_bitmap_event: Some(500),
            enable_repetition: false,
        },
    )
    .unwrap_err();
    assert!(matches!(err, CdgError::Overbudget { .. }));
}

#[test]
fn scenario_6_bmp_y_flip() {
    let width = 10;
    let height = 10;
    let row_stride = (width + 3) & !3;
    let file_header_len = 14;
    let dib_header_len = 40;
    let palette_len = 256 * 4;
    let pixel_offset = file_header_len + dib_header_len + palette_len;
    let pixel_len = row_stride * height;
    let file_size = pixel_offset + pixel_len;

    let mut bytes = vec![0u8; file_size];
    bytes[0] = b'B';
    bytes[1] = b'M';
    bytes[2..6].copy_from_slice(&(file_size as u32).to_le_bytes());
    bytes[10..14].copy_from_slice(&(pixel_offset as u32).to_le_bytes());
    bytes[file_header_len..file_header_len + 4]
        .copy_from_slice(&(dib_header_len as u32).to_le_bytes());
    bytes[file_header_len + 4..file_header_len + 8].copy_from_slice(&(width as i32).to_le_bytes());
    bytes[file_header_len + 8..file_header_len + 12]
        .copy_from_slice(&(height as i32).to_le_bytes());
    bytes[file_header_len + 12..file_header_len + 14].copy_from_slice(&1u16.to_le_bytes());
    bytes[file_header_len + 14..file_header_len + 16].copy_from_slice(&8u16.to_le_bytes());

    // visual top row (file's LAST row) = color 20, visual bottom row (file's
    // FIRST row) = color 10.
    let top_visual_file_row = height - 1;
    let bottom_visual_file_row = 0;
    let top_start = pixel_offset + top_visual_file_row * row_stride;
    bytes[top_start..top_start + width].copy_from_slice(&[20u8; 10]);
    let bottom_start = pixel_offset + bottom_visual_file_row * row_stride;
    bytes[bottom_start..bottom_start + width].copy_from_slice(&[10u8; 10]);

    let bitmap = bmp::load(&bytes).unwrap();
    assert_eq!(bitmap.pixel(0, 0), 20);
    assert_eq!(bitmap.pixel(0, 9), 10);
}

#[test]
fn round_trip_law_bitmap_survives_full_event_duration() {
    let mut pixels = vec![3u8; 12 * 24];
    for (i, p) in pixels.iter_mut().enumerate() {
        *p = ((i % 4) + 1) as u8;
    }
    let bitmap = Bitmap::new(12, 24, pixels.clone(), [Rgba::default(); 256]).with_offset(0, 0);

    let mut timeline = EventTimeline::new();
    timeline
        .insert(Event {
            start_offset_packs: 100,
            duration_packs: 1000,
            payload: Payload::Bitmap(bitmap),
            border_index: NO_PRESET,
            memory_preset_index: NO_PRESET,
            track: 0,
            channel: 0,
            label: Some("round-trip".into()),
        })
        .unwrap();

    let palette = ramp_palette();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs: 1200,
        initial_palette: &palette,
        initial_border: 0,
        initial_clear_color: 0,
        initial_transparent: 0,
    };
    let packets = schedule(&input, &SchedulerConfig::default()).unwrap();

    let mut decoder = Decoder::new();
    for p in &packets[..1100] {
        decoder.apply(p);
    }
    for y in 0..24usize {
        for x in 0..12usize {
            assert_eq!(decoder.pixel(x, y), pixels[y * 12 + x]);
        }
    }
}

#[test]
fn idempotence_memory_preset_and_zero_mask_xor() {
    let mut decoder = Decoder::new();
    let preset = packet::Packet::memory_preset(4, 0);
    decoder.apply(&preset);
    let before = decoder.pixel(0, 0);
    decoder.apply(&preset);
    assert_eq!(decoder.pixel(0, 0), before);

    let xor_noop = packet::Packet::tile(INSTR_XOR_FONT, 0, 0, 0, 0, [0x00; 12]);
    let before_tile = decoder.read_tile(0, 0);
    decoder.apply(&xor_noop);
    assert_eq!(decoder.read_tile(0, 0), before_tile);
}

#[test]
fn unchanged_tile_across_two_events_emits_nothing_the_second_time() {
    let bitmap_a = Bitmap::new(6, 12, vec![9; 72], [Rgba::default(); 256]).with_offset(0, 0);
    let bitmap_b = Bitmap::new(6, 12, vec![9; 72], [Rgba::default(); 256]).with_offset(0, 0);

    let mut timeline = EventTimeline::new();
    timeline
        .insert(Event {
            start_offset_packs: 0,
            duration_packs: 10,
            payload: Payload::Bitmap(bitmap_a),
            border_index: NO_PRESET,
            memory_preset_index: NO_PRESET,
            track: 0,
            channel: 0,
            label: Some("first".into()),
        })
        .unwrap();
    timeline
        .insert(Event {
            start_offset_packs: 10,
            duration_packs: 10,
            payload: Payload::Bitmap(bitmap_b),
            border_index: NO_PRESET,
            memory_preset_index: NO_PRESET,
            track: 0,
            channel: 0,
            label: Some("second".into()),
        })
        .unwrap();

    let palette = ramp_palette();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs: 20,
        initial_palette: &palette,
        initial_border: 0,
        initial_clear_color: 0,
        initial_transparent: 0,
    };
    let packets = schedule(&input, &SchedulerConfig::default()).unwrap();
    assert_eq!(packets[..5].iter().filter(|p| !p.is_empty()).count(), 5);
    assert_eq!(packets[5..10].iter().filter(|p| !p.is_empty()).count(), 1);
    assert_eq!(packets[10..20].iter().filter(|p| !p.is_empty()).count(), 0);
}

#[test]
fn instruction_closure_all_nonempty_packets_use_known_instructions() {
    let mut timeline = EventTimeline::new();
    timeline.insert(clear_event(0, 10, 0)).unwrap();
    let bitmap = Bitmap::new(6, 12, vec![1; 72], [Rgba::default(); 256]).with_offset(30, 30);
    timeline
        .insert(Event {
            start_offset_packs: 10,
            duration_packs: 10,
            payload: Payload::Bitmap(bitmap),
            border_index: 2,
            memory_preset_index: NO_PRESET,
            track: 1,
            channel: 0,
            label: None,
        })
        .unwrap();

    let palette = ramp_palette();
    let input = SchedulerInput {
        timeline: &timeline,
        total_packs: 20,
        initial_palette: &palette,
        initial_border: 0,
        initial_clear_color: 0,
        initial_transparent: 0,
    };
    let packets = schedule(&input, &SchedulerConfig::default()).unwrap();
    for p in packets.iter().filter(|p| !p.is_empty()) {
        assert!(packet::KNOWN_INSTRUCTIONS.contains(&p.instruction()));
    }
}
