use parse_sagittal::{
    EvaluationResult, PointsShape, RadiusTable, RigAngle, RowlandCircle, SagittalBench,
    SurveyLoader, TiltSurvey,
};
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "parse-sagittal",
    about = "Parsing sagittal bender survey measurements"
)]
struct Opt {
    /// Path to the survey data file
    #[structopt(long, default_value = "all_points.dat")]
    path: String,
    /// Points recorded per actuator position (12 or 13)
    #[structopt(long, default_value = "12")]
    points: PointsShape,
    /// Rig angular position (0-5)
    #[structopt(short, long, default_value = "0")]
    angle: usize,
    /// Measurement run (repeat) index
    #[structopt(short, long, default_value = "0")]
    run: usize,
    /// Meridional (Rowland circle) radius [mm]
    #[structopt(long, default_value = "500")]
    rm: f64,
    /// Evaluate every angular position of the selected run
    #[structopt(long)]
    all: bool,
}

fn report(angle: usize, run: usize, rm: f64, survey: &TiltSurvey, result: &EvaluationResult) {
    match RigAngle::from_index(angle) {
        Some(rig) => println!(
            "=== {} (nominal theta {:.0} deg), run {} ===",
            rig,
            rig.theta(),
            run
        ),
        None => println!("=== angle {}, run {} ===", angle, run),
    }
    println!("{}", survey);
    let rowland = RowlandCircle::default()
        .meridional_radius(rm)
        .bragg_angle(survey.theta_mean);
    println!(
        "predicted sagittal radius at th0_mean: {:.3} mm",
        rowland.predicted_radius()
    );
    if let Some(rs0) = result.central_radii().next() {
        println!("measured central radius (first position): {:.3} mm", rs0);
    }
    println!("{}", RadiusTable { angle, run, result });
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let opt = Opt::from_args();

    let dataset = SurveyLoader::default()
        .data_path(&opt.path)
        .points_shape(opt.points)
        .load()?;
    if let Some(truncation) = &dataset.truncation {
        println!("WARNING: {}", truncation);
    }

    let mut bench =
        SagittalBench::new(RowlandCircle::default().meridional_radius(opt.rm), dataset);
    if opt.all {
        for eval in bench.evaluate_all(opt.run)? {
            report(eval.angle, opt.run, opt.rm, &eval.survey, &eval.result);
        }
    } else {
        let survey = bench.survey(opt.angle, opt.run)?;
        let result = bench.evaluate(opt.angle, opt.run)?;
        report(opt.angle, opt.run, opt.rm, &survey, &result);
    }

    Ok(())
}
