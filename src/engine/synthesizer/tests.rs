// Unit tests for the command synthesizer

use super::*;
use crate::domain::model::{SaveMode, SourceProfile};
use crate::engine::templates::EncodingSettings;
use crate::planner::{CutPlanner, KeyframeIndex};
use crate::selection::SelectionSet;

const SECOND: Micros = 1_000_000;

fn synthesizer() -> CommandSynthesizer {
    CommandSynthesizer::new(TemplateRegistry::with_defaults(EncodingSettings::default()))
}

fn index() -> KeyframeIndex {
    let keyframes: Vec<i64> = (0..10).map(|i| i * 2_000_000).collect();
    KeyframeIndex::build(20_000_000, &keyframes).unwrap()
}

fn target() -> OutputTarget {
    OutputTarget::new("/videos/trip.mp4", "/out").with_temp_root("/tmp")
}

fn plan_with(
    synth: &CommandSynthesizer,
    source: SourceProfile,
    ranges: &[(Micros, Micros)],
    mode: SaveMode,
    format: OutputFormat,
) -> Plan {
    let mut set = SelectionSet::new(20 * SECOND);
    for &(start, end) in ranges {
        set.add_range(start, end).unwrap();
    }
    CutPlanner::new(source, synth)
        .plan(&set, &index(), mode, format)
        .unwrap()
}

fn h264() -> SourceProfile {
    SourceProfile::new("mp4")
        .with_video_codec("h264")
        .with_pix_fmt("yuv420p")
        .with_video_profile("High")
        .with_frame_rate("30000/1001")
}

fn has_pair(args: &[String], flag: &str, value: &str) -> bool {
    args.windows(2).any(|w| w[0] == flag && w[1] == value)
}

#[test]
fn test_aligned_ranges_copy_then_join() {
    let synth = synthesizer();
    let plan = plan_with(
        &synth,
        h264(),
        &[(2 * SECOND, 4 * SECOND), (8 * SECOND, 12 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Original,
    );

    let invocations = synth
        .synthesize_with_work_id(&plan, &target(), WorkId::new(7, 1))
        .unwrap();

    let roles: Vec<Role> = invocations.steps.iter().map(|s| s.role).collect();
    assert_eq!(roles, vec![Role::Extract, Role::Extract, Role::Concat]);
    assert!(invocations.is_lossless());
    assert_eq!(invocations.work_dir, PathBuf::from("/tmp/keycut-7-1"));
    assert_eq!(
        invocations.outputs,
        vec![PathBuf::from("/out/trip_edited.mp4")]
    );

    let concat = &invocations.steps[2];
    assert_eq!(concat.depends_on, vec![0, 1]);
    let manifest = concat.manifest.as_ref().unwrap();
    assert_eq!(
        manifest.contents,
        "file '/tmp/keycut-7-1/op0-seg0.mp4'\nfile '/tmp/keycut-7-1/op1-seg0.mp4'\n"
    );
    assert!(has_pair(&invocations.steps[0].args, "-ss", "2.000000"));
    assert!(has_pair(&invocations.steps[0].args, "-t", "2.000000"));
    assert!(has_pair(&invocations.steps[0].args, "-c", "copy"));
}

#[test]
fn test_edge_split_reencodes_only_slivers() {
    let synth = synthesizer();
    let plan = plan_with(
        &synth,
        h264(),
        &[(3 * SECOND, 9 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Original,
    );

    let invocations = synth
        .synthesize_with_work_id(&plan, &target(), WorkId::new(1, 1))
        .unwrap();
    let steps = &invocations.steps;

    assert_eq!(steps.len(), 4);
    assert!(!steps[0].is_lossless_hint);
    assert!(has_pair(&steps[0].args, "-c:v", "libx264"));
    // decode from the keyframe at 2s, then trim one second
    assert!(has_pair(&steps[0].args, "-ss", "2.000000"));
    assert!(has_pair(&steps[0].args, "-ss", "1.000000"));
    assert!(steps[1].is_lossless_hint);
    assert!(has_pair(&steps[0].args, "-pix_fmt", "yuv420p"));
    assert!(has_pair(&steps[0].args, "-profile:v", "high"));
    assert!(has_pair(&steps[0].args, "-r", "30000/1001"));
    assert!(has_pair(&steps[2].args, "-c:v", "libx264"));
    assert!(has_pair(&steps[2].args, "-pix_fmt", "yuv420p"));
    assert_eq!(steps[3].role, Role::Concat);
    assert_eq!(steps[3].output_path, PathBuf::from("/out/trip_edited.mp4"));
    assert!(steps[..3].iter().all(|s| s.is_temporary));
}

#[test]
fn test_synthesis_differs_only_in_work_id() {
    let synth = synthesizer();
    let plan = plan_with(
        &synth,
        h264(),
        &[(1 * SECOND, 5 * SECOND), (9 * SECOND, 15 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Original,
    );

    let first = synth.synthesize(&plan, &target()).unwrap();
    let second = synth.synthesize(&plan, &target()).unwrap();
    assert_ne!(first.work_id, second.work_id);

    let normalize = |inv: &Invocations| {
        let dir = inv.work_dir.to_string_lossy().to_string();
        serde_json::to_string(&inv.steps)
            .unwrap()
            .replace(&dir, "<work>")
    };
    assert_eq!(normalize(&first), normalize(&second));
}

#[test]
fn test_unregistered_format_is_unsupported() {
    let mut registry = TemplateRegistry::with_defaults(EncodingSettings::default());
    registry.unregister(OutputFormat::Avi);
    let synth = CommandSynthesizer::new(registry);
    let plan = plan_with(
        &synth,
        h264(),
        &[(2 * SECOND, 4 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Avi,
    );

    assert!(matches!(
        synth.synthesize(&plan, &target()),
        Err(CutError::UnsupportedFormat { .. })
    ));
}

#[test]
fn test_gif_join_goes_through_intermediate() {
    let synth = synthesizer();
    let source = h264().with_dimensions(640, 360);
    let plan = plan_with(
        &synth,
        source,
        &[(0, 2 * SECOND), (4 * SECOND, 6 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Gif,
    );

    let invocations = synth
        .synthesize_with_work_id(&plan, &target(), WorkId::new(1, 2))
        .unwrap();
    let roles: Vec<Role> = invocations.steps.iter().map(|s| s.role).collect();
    assert_eq!(
        roles,
        vec![Role::Extract, Role::Extract, Role::Concat, Role::Transcode]
    );

    assert!(invocations.steps[0].output_path.to_string_lossy().ends_with(".mkv"));
    assert!(invocations.steps[2].is_temporary);
    let last = &invocations.steps[3];
    assert_eq!(last.depends_on, vec![2]);
    assert_eq!(last.output_path, PathBuf::from("/out/trip_edited.gif"));
    assert!(last.args.iter().any(|a| a.contains("scale=480:-1")));
}

#[test]
fn test_split_outputs_are_numbered() {
    let synth = synthesizer();
    let plan = plan_with(
        &synth,
        h264(),
        &[(2 * SECOND, 4 * SECOND), (8 * SECOND, 12 * SECOND)],
        SaveMode::SplitBySelections,
        OutputFormat::Mp3,
    );

    let invocations = synth.synthesize(&plan, &target()).unwrap();
    assert_eq!(
        invocations.outputs,
        vec![
            PathBuf::from("/out/trip_part_1.mp3"),
            PathBuf::from("/out/trip_part_2.mp3"),
        ]
    );
    assert!(invocations.steps.iter().all(|s| s.role == Role::Extract));
    assert!(invocations.steps.iter().all(|s| s.args.contains(&"-vn".to_string())));
}

#[test]
fn test_explicit_output_path_for_single_output() {
    let synth = synthesizer();
    let plan = plan_with(
        &synth,
        h264(),
        &[(2 * SECOND, 4 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Original,
    );

    let target = target().with_output_path("/elsewhere/final.mp4");
    let invocations = synth.synthesize(&plan, &target).unwrap();
    assert_eq!(invocations.outputs, vec![PathBuf::from("/elsewhere/final.mp4")]);
    assert_eq!(invocations.steps.len(), 1);
}

#[test]
fn test_unknown_codec_edges_are_escalated() {
    let synth = synthesizer();
    let source = SourceProfile::new("mov").with_video_codec("prores");

    let plan = plan_with(
        &synth,
        source.clone(),
        &[(3 * SECOND, 9 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Original,
    );
    let op = &plan.operations()[0];
    assert!(op.escalated);
    assert_eq!(op.segments.len(), 1);

    let invocations = synth.synthesize(&plan, &target()).unwrap();
    assert_eq!(invocations.steps.len(), 1);
    assert!(has_pair(&invocations.steps[0].args, "-c:v", "libx264"));
}

#[test]
fn test_escalation_spreads_across_a_join() {
    let synth = synthesizer();
    let source = SourceProfile::new("mov").with_video_codec("prores");

    let plan = plan_with(
        &synth,
        source,
        &[(2 * SECOND, 4 * SECOND), (7 * SECOND, 9 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Original,
    );

    assert!(plan.operations().iter().all(|op| op.escalated));
    assert!(synth.check(&plan).is_ok());
}

#[test]
fn test_unmatchable_stream_parameters_escalate() {
    let synth = synthesizer();
    let sources = [
        h264().with_pix_fmt("gbrp"),
        h264().with_video_profile("Extended"),
        SourceProfile {
            pix_fmt: None,
            ..h264()
        },
        SourceProfile {
            frame_rate: None,
            ..h264()
        },
    ];

    for source in sources {
        let plan = plan_with(
            &synth,
            source.clone(),
            &[(3 * SECOND, 9 * SECOND)],
            SaveMode::KeepSelections,
            OutputFormat::Original,
        );
        let op = &plan.operations()[0];
        assert!(op.escalated, "{:?}", source);
        assert_eq!(op.segments.len(), 1);
        assert!(synth.check(&plan).is_ok());
    }
}

#[test]
fn test_ten_bit_slivers_keep_their_profile() {
    let synth = synthesizer();
    let source = h264()
        .with_pix_fmt("yuv420p10le")
        .with_video_profile("High 10");
    let plan = plan_with(
        &synth,
        source,
        &[(3 * SECOND, 9 * SECOND)],
        SaveMode::KeepSelections,
        OutputFormat::Original,
    );
    assert!(!plan.operations()[0].escalated);

    let invocations = synth.synthesize(&plan, &target()).unwrap();
    let lead = &invocations.steps[0].args;
    assert!(has_pair(lead, "-pix_fmt", "yuv420p10le"));
    assert!(has_pair(lead, "-profile:v", "high10"));
}

#[test]
fn test_probe_invocations() {
    let steps = CommandSynthesizer::probe_invocations(Path::new("/videos/trip.mp4"));

    assert_eq!(steps.len(), 2);
    assert!(steps.iter().all(|s| s.role == Role::Probe));
    assert!(steps[0].args.contains(&"-show_streams".to_string()));
    assert!(has_pair(&steps[1].args, "-skip_frame", "nokey"));
    assert_eq!(steps[1].args.last().unwrap(), "/videos/trip.mp4");
}
