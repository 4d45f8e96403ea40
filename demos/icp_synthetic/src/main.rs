use argh::FromArgs;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::path::PathBuf;

use icp_registration as icp;

#[derive(FromArgs)]
/// Register a randomly perturbed copy of a synthetic point cloud onto the original
struct Args {
    /// number of points in the reference cloud
    #[argh(option, default = "1000")]
    num_points: usize,

    /// side of the cube the points are sampled in
    #[argh(option, default = "10.0")]
    max_range: f64,

    /// seed of the random generator
    #[argh(option, default = "0")]
    seed: u64,

    /// rotation angle of the perturbation in radians
    #[argh(option, default = "0.05")]
    angle: f64,

    /// translation of the perturbation along each axis
    #[argh(option, default = "0.1")]
    shift: f64,

    /// fraction of moving points replaced by points without counterpart
    #[argh(option, default = "0.0")]
    outlier_ratio: f64,

    /// path to a JSON file with the registration parameters
    #[argh(option)]
    config: Option<PathBuf>,

    /// maximum number of iterations
    #[argh(option)]
    max_iterations: Option<usize>,

    /// relative decrease of the mean distance below which registration stops
    #[argh(option)]
    decrease_threshold: Option<f64>,

    /// fraction of moving points used by the trimmed variant
    #[argh(option)]
    overlap_ratio: Option<f64>,

    /// use the trimmed variant
    #[argh(switch)]
    trimmed: bool,
}

fn load_params(args: &Args) -> Result<icp::IcpParams, Box<dyn std::error::Error>> {
    let mut params = match &args.config {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => icp::IcpParams::default(),
    };
    if let Some(max_iterations) = args.max_iterations {
        params.max_iterations = max_iterations;
    }
    if let Some(decrease_threshold) = args.decrease_threshold {
        params.decrease_threshold = decrease_threshold;
    }
    if let Some(overlap_ratio) = args.overlap_ratio {
        params.overlap_ratio = overlap_ratio;
    }
    params.validate()?;
    Ok(params)
}

fn random_cloud(rng: &mut StdRng, num_points: usize, max_range: f64) -> Vec<[f64; 3]> {
    (0..num_points)
        .map(|_| {
            [
                rng.random_range(0.0..max_range),
                rng.random_range(0.0..max_range),
                rng.random_range(0.0..max_range),
            ]
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args: Args = argh::from_env();
    let params = load_params(&args)?;
    log::debug!("Registration parameters: {:?}", params);
    let mut rng = StdRng::seed_from_u64(args.seed);

    let reference = icp::PointCloud::new(random_cloud(&mut rng, args.num_points, args.max_range));
    println!("Reference cloud: #{} points", reference.len());

    let axis = [
        rng.random_range(-1.0..1.0),
        rng.random_range(-1.0..1.0),
        rng.random_range(0.1..1.0),
    ];
    let motion = icp::RigidTransform::from_rotation_translation(
        &icp::axis_angle_to_rotation_matrix(&axis, args.angle)?,
        &[args.shift, args.shift, args.shift],
    );

    let mut moving = reference.transformed(&motion).into_points();
    let num_outliers = (args.outlier_ratio.clamp(0.0, 1.0) * moving.len() as f64) as usize;
    let outliers = random_cloud(&mut rng, num_outliers, args.max_range);
    for (p, outlier) in moving.iter_mut().zip(outliers) {
        *p = [
            outlier[0] + 2.0 * args.max_range,
            outlier[1],
            outlier[2],
        ];
    }
    let moving = icp::PointCloud::new(moving);
    println!(
        "Moving cloud: #{} points ({} without counterpart)",
        moving.len(),
        num_outliers
    );

    let result = if args.trimmed {
        icp::icp_trimmed(&reference, moving, &params)?
    } else {
        icp::icp(&reference, moving, &params)?
    };

    println!(
        "State: {:?} after {} iterations, mean squared distance {:e}",
        result.state, result.num_iterations, result.mean_distance
    );
    println!("Estimated transform:");
    for row in result.transform.matrix() {
        println!("  {:>12.6} {:>12.6} {:>12.6} {:>12.6}", row[0], row[1], row[2], row[3]);
    }

    let expected = motion.inverse().matrix();
    let max_error = result
        .transform
        .matrix()
        .iter()
        .flatten()
        .zip(expected.iter().flatten())
        .map(|(a, b)| (a - b).abs())
        .fold(0.0, f64::max);
    println!("Max deviation from the ground truth: {:e}", max_error);

    Ok(())
}
