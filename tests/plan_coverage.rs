use outward::{
    CenterOfFocus, PlannedSquares, SquareKey, calculate_expansion, create_planned_squares,
    initial_square_position,
};

/// Rasterizes the plan onto a per-pixel boolean grid.
fn coverage(plan: &PlannedSquares, out_width: u32, out_height: u32) -> Vec<bool> {
    let mut grid = vec![false; (out_width * out_height) as usize];
    for (_, square) in plan.iter() {
        let x1 = square.right().min(out_width);
        let y1 = square.bottom().min(out_height);
        for y in square.y..y1 {
            for x in square.x..x1 {
                grid[(y * out_width + x) as usize] = true;
            }
        }
    }
    grid
}

#[test]
fn documented_session_plan_covers_the_canvas() {
    // 512x512 input centered in a 1024x1024 canvas, square 512, step 256.
    let plan = create_planned_squares((256, 0), 512, 256, 1024, 1024);

    let keys: Vec<String> = plan.iter().map(|(key, _)| key.to_string()).collect();
    assert_eq!(
        keys,
        [
            "init-0",
            "left-0",
            "right-0",
            "down-0",
            "down-1",
            "down_left-0",
            "down_left-1",
            "down_right-0",
            "down_right-1",
        ]
    );

    let mut positions: Vec<(u32, u32)> = plan.iter().map(|(_, s)| (s.x, s.y)).collect();
    positions.sort_unstable();
    let mut expected: Vec<(u32, u32)> = [0u32, 256, 512]
        .iter()
        .flat_map(|&y| [0u32, 256, 512].iter().map(move |&x| (x, y)))
        .collect();
    expected.sort_unstable();
    assert_eq!(positions, expected);

    assert!(coverage(&plan, 1024, 1024).iter().all(|&covered| covered));
}

#[test]
fn plans_cover_the_canvas_for_varied_geometries() {
    for (iw, ih, ow, oh, square, step, fx, fy) in [
        (512u32, 512u32, 1024u32, 1024u32, 512u32, 256u32, 256u32, 256u32),
        (640, 360, 1920, 1080, 512, 256, 100, 300),
        // Extreme focus: the centered initial position overhangs the far
        // edge and must be clamped back onto the canvas.
        (100, 100, 1024, 1024, 256, 128, 99, 0),
        // Step equal to the square side: adjacent squares, no overlap.
        (256, 256, 512, 512, 256, 256, 128, 128),
    ] {
        let exp = calculate_expansion(CenterOfFocus::new(fx, fy), iw, ih, ow, oh).unwrap();
        let initial = initial_square_position(exp, square, iw, ih);
        let plan = create_planned_squares(initial, square, step, ow, oh);
        assert!(
            coverage(&plan, ow, oh).iter().all(|&covered| covered),
            "uncovered pixels outpainting {iw}x{ih} to {ow}x{oh}"
        );
    }
}

#[test]
fn identical_inputs_build_identical_plans() {
    let a = create_planned_squares((264, 524), 512, 256, 1920, 1080);
    let b = create_planned_squares((264, 524), 512, 256, 1920, 1080);

    let flatten = |plan: &PlannedSquares| -> Vec<(String, u32, u32)> {
        plan.iter().map(|(k, s)| (k.to_string(), s.x, s.y)).collect()
    };
    assert_eq!(flatten(&a), flatten(&b));
}

#[test]
fn square_keys_survive_the_string_round_trip() {
    let plan = create_planned_squares((256, 0), 512, 256, 1024, 1024);
    for (key, _) in plan.iter() {
        let parsed: SquareKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, *key);
    }
}
