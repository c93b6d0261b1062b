use console::Style;
use isr_core::pipeline::{RunConfig, RunSummary};

struct Styles {
    title: Style,
    header: Style,
    label: Style,
    value: Style,
    good: Style,
    bad: Style,
    path: Style,
}

impl Styles {
    fn new() -> Self {
        Self {
            title: Style::new().cyan().bold(),
            header: Style::new().cyan().bold(),
            label: Style::new().dim(),
            value: Style::new().bold().white(),
            good: Style::new().green(),
            bad: Style::new().red(),
            path: Style::new().underlined(),
        }
    }
}

pub fn print_run_summary(config: &RunConfig) {
    let s = Styles::new();

    println!();
    println!("  {}", s.title.apply_to("Instrument Signature Removal"));
    println!("  {}", s.title.apply_to("════════════════════════════"));
    println!();

    println!(
        "  {:<14}{}",
        s.label.apply_to("Raw frames"),
        s.path.apply_to(config.raw_dir.display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Darks"),
        s.path.apply_to(config.dark_dir().display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Masters"),
        s.path.apply_to(config.calib_dir().display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Output"),
        s.path.apply_to(config.output_dir().display())
    );
    println!(
        "  {:<14}{}",
        s.label.apply_to("Target"),
        s.value.apply_to(&config.target)
    );
    println!();

    println!("  {}", s.header.apply_to("Detector"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Full well"),
        s.value
            .apply_to(format!("{:.0} ADU", config.detector.full_well_adu))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Margin"),
        s.value
            .apply_to(format!("{:.0}%", config.detector.saturation_margin * 100.0))
    );
    println!(
        "    {:<12}{}",
        s.label.apply_to("Flat region"),
        s.value
            .apply_to(format!("central, {:.0}% margin", config.central_region.margin * 100.0))
    );
    println!();
}

pub fn print_run_report(report: &RunSummary) {
    let s = Styles::new();

    println!("  {}", s.header.apply_to("Results"));
    println!(
        "    {:<12}{}",
        s.label.apply_to("Classified"),
        s.value.apply_to(report.classified)
    );
    if !report.skipped.is_empty() {
        println!(
            "    {:<12}{}",
            s.label.apply_to("Skipped"),
            s.bad.apply_to(report.skipped.len())
        );
        for (path, reason) in &report.skipped {
            println!("      {} ({reason})", s.label.apply_to(path.display()));
        }
    }
    println!(
        "    {:<12}{}",
        s.label.apply_to("Masters"),
        s.value.apply_to(report.master_paths.len())
    );

    for filter in &report.filters {
        match &filter.error {
            None => println!(
                "    {:<12}{}",
                s.label.apply_to(format!("Filter {}", filter.filter)),
                s.good
                    .apply_to(format!("{} calibrated frame(s)", filter.calibrated))
            ),
            Some(err) => println!(
                "    {:<12}{}",
                s.label.apply_to(format!("Filter {}", filter.filter)),
                s.bad.apply_to(err)
            ),
        }
    }
    println!();
}
