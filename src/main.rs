//! CA3D CLI - run, sample and evolve 3D binary cellular automata.

#[cfg(feature = "dhat-heap")]
#[global_allocator]
static ALLOC: dhat::Alloc = dhat::Alloc;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::de::DeserializeOwned;

use ca3d_evolve::{
    compute::{
        Experiment, Genome, GenomeRng, SimulationSession, evolution::JsonDirStore, sample_range,
        write_json,
    },
    explorer::{Explorer, LoadOutcome},
    schema::{
        EvolutionConfig, ExperimentKind, SampledGenome, SamplingConfig, Seed, SimulationConfig,
    },
};

fn main() {
    #[cfg(feature = "dhat-heap")]
    let _profiler = dhat::Profiler::new_heap();

    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(String::as_str) {
        Some("--example") => print_example_configs(),
        Some("run") if args.len() >= 3 => run(&args[2..]),
        Some("sample") if args.len() >= 6 => sample(&args[2..]),
        Some("batch") if args.len() >= 4 => batch(&args[2..]),
        Some("evolve") if args.len() >= 4 => evolve(&args[2..]),
        _ => {
            print_usage(&args[0]);
            std::process::exit(1);
        }
    }
}

fn print_usage(program: &str) {
    eprintln!("Usage: {} <command> [args]", program);
    eprintln!();
    eprintln!("Commands:");
    eprintln!("  run <config.json> [steps]");
    eprintln!("      Step one rule (<config>.rule.txt, else random) and report counts");
    eprintln!("  sample <sampling.json> <k_from> <k_to> <amount> [sample.json]");
    eprintln!("      Sample genomes with K live bits in k_from..=k_to");
    eprintln!("  batch <sampling.json> <count> [data.json]");
    eprintln!("      Append random-K trajectory records to an experiment file");
    eprintln!("  evolve <evolution.json> <generations> [state_dir]");
    eprintln!("      Evolve with activity fitness, persisting to state_dir");
    eprintln!();
    eprintln!("Example configurations are printed with --example.");
}

fn print_example_configs() {
    let configs = [
        ("simulation", to_json(&SimulationConfig::default())),
        ("sampling", to_json(&SamplingConfig::default())),
        ("evolution", to_json(&EvolutionConfig::default())),
    ];
    for (name, json) in configs {
        println!("// {}", name);
        println!("{}", json);
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        eprintln!("Error serializing example: {}", e);
        std::process::exit(1);
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> T {
    let text = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading {}: {}", path.display(), e);
        std::process::exit(1);
    });
    serde_json::from_str(&text).unwrap_or_else(|e| {
        eprintln!("Error parsing {}: {}", path.display(), e);
        std::process::exit(1);
    })
}

fn parse_arg<T: std::str::FromStr>(value: &str, name: &str) -> T {
    value.parse().unwrap_or_else(|_| {
        eprintln!("Invalid {}: {}", name, value);
        std::process::exit(1);
    })
}

fn fail(context: &str, error: impl std::fmt::Display) -> ! {
    eprintln!("{}: {}", context, error);
    std::process::exit(1);
}

fn run(args: &[String]) {
    let config_path = PathBuf::from(&args[0]);
    let steps: usize = args.get(1).map(|s| parse_arg(s, "steps")).unwrap_or(100);
    let config: SimulationConfig = read_json(&config_path);

    let rule_path = config_path.with_extension("rule.txt");
    let genome = if rule_path.exists() {
        let text = fs::read_to_string(&rule_path).unwrap_or_else(|e| fail("Error reading rule", e));
        Genome::parse_rule_str(text.trim(), config.family.genome_len())
    } else {
        GenomeRng::random().random_genome(config.family.genome_len(), 0.5)
    };

    let seed_path = config_path.with_extension("seed.json");
    let seed: Seed = if seed_path.exists() {
        read_json(&seed_path)
    } else {
        Seed::default()
    };

    println!("CA3D Simulation");
    println!("===============");
    println!(
        "Lattice: {}x{}x{} ({:?}, {:?})",
        config.width, config.height, config.depth, config.topology, config.family
    );
    if config.family.genome_len() <= 64 {
        println!("Rule: {}", genome.to_rule_string());
    }
    println!("Steps: {}", steps);
    println!();

    let mut session = SimulationSession::new(&config, &genome, &seed)
        .unwrap_or_else(|e| fail("Error creating session", e));
    println!("Initial alive: {}", session.stats().alive);

    let start = Instant::now();
    for i in 0..steps {
        let report = session.step();
        if (i + 1) % (steps / 10).max(1) == 0 {
            println!(
                "  Step {}/{}: alive={}, flicker={}, {:.1} steps/s",
                i + 1,
                steps,
                report.alive,
                report.flicker,
                (i + 1) as f32 / start.elapsed().as_secs_f32()
            );
        }
    }

    let stats = session.stats();
    println!();
    println!(
        "Final: {} alive of {} ({:.2}%)",
        stats.alive,
        stats.volume,
        stats.density() * 100.0
    );
    println!("Time: {:.2}s", start.elapsed().as_secs_f32());
}

fn sample(args: &[String]) {
    let config: SamplingConfig = read_json(Path::new(&args[0]));
    let k_from: usize = parse_arg(&args[1], "k_from");
    let k_to: usize = parse_arg(&args[2], "k_to");
    let amount: usize = parse_arg(&args[3], "amount");
    let out = PathBuf::from(args.get(4).map(String::as_str).unwrap_or("sample.json"));
    let genomes_path = out.with_file_name(format!(
        "{}_genomes.json",
        out.file_stem().and_then(|s| s.to_str()).unwrap_or("sample")
    ));

    let mut rng = GenomeRng::random();
    let batch = sample_range(&config, k_from, k_to, amount, &mut rng)
        .unwrap_or_else(|e| fail("Sampling failed", e));

    let mut experiment = Experiment::open(&out, &config, ExperimentKind::Sample)
        .unwrap_or_else(|e| fail("Error opening experiment", e));
    experiment.extend(batch.records);
    experiment
        .save()
        .unwrap_or_else(|e| fail("Error saving experiment", e));

    let mut genomes: Vec<SampledGenome> = if genomes_path.exists() {
        read_json(&genomes_path)
    } else {
        Vec::new()
    };
    genomes.extend(batch.genomes);
    write_json(&genomes_path, &genomes).unwrap_or_else(|e| fail("Error saving genomes", e));

    println!(
        "{} records in {}, {} genomes in {}",
        experiment.records().len(),
        out.display(),
        genomes.len(),
        genomes_path.display()
    );
}

fn batch(args: &[String]) {
    let config: SamplingConfig = read_json(Path::new(&args[0]));
    let count: usize = parse_arg(&args[1], "count");
    let out = PathBuf::from(args.get(2).map(String::as_str).unwrap_or("data.json"));

    let mut experiment = Experiment::open(&out, &config, ExperimentKind::Raw)
        .unwrap_or_else(|e| fail("Error opening experiment", e));
    let mut rng = GenomeRng::random();
    let start = Instant::now();
    let added = experiment
        .run_batch(&config, count, &mut rng)
        .unwrap_or_else(|e| fail("Batch failed", e));

    let density_path = out.with_extension("density.json");
    write_json(&density_path, &experiment.density())
        .unwrap_or_else(|e| fail("Error saving density samples", e));

    println!(
        "{} records added ({} total) in {:.2}s; density samples in {}",
        added,
        experiment.records().len(),
        start.elapsed().as_secs_f32(),
        density_path.display()
    );
}

fn evolve(args: &[String]) {
    let config: EvolutionConfig = read_json(Path::new(&args[0]));
    let generations: usize = parse_arg(&args[1], "generations");
    let state_dir = PathBuf::from(args.get(2).map(String::as_str).unwrap_or("state"));
    let mutation = config.mutation;

    let mut explorer = Explorer::new(config, JsonDirStore::new(&state_dir))
        .unwrap_or_else(|e| fail("Error creating explorer", e));
    match explorer.load_population() {
        LoadOutcome::Restored => println!("Resumed population from {}", state_dir.display()),
        LoadOutcome::Empty => println!("Started new population in {}", state_dir.display()),
        LoadOutcome::Rejected(reason) => println!("Stored population rejected: {}", reason),
        LoadOutcome::Unavailable(reason) => println!("Running in memory only: {}", reason),
    }

    for _ in 0..generations {
        let awarded = explorer
            .score_activity()
            .unwrap_or_else(|e| fail("Scoring failed", e));
        let report = explorer
            .evolve(mutation.percent, mutation.max_genes)
            .unwrap_or_else(|e| fail("Evolution failed", e));
        println!(
            "Generation {}: {} active rules, {} genomes mutated",
            report.generation, awarded, report.mutated_genomes
        );
    }

    let population = explorer.population();
    println!();
    println!("Mean genome density: {:.3}", population.mean_density());
    if population.genome_len() <= 64 {
        for genome in population.genomes().iter().take(5) {
            println!("  {}", genome.to_rule_string());
        }
    }
}
