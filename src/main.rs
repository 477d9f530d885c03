use clap::{ArgAction, Parser, Subcommand};
use collatz_viz::report::{format_big, save_run, timestamp};
use collatz_viz::*;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// コラッツ写像 (3n+1) の軌道計算
#[derive(Parser)]
#[command(name = "collatz-viz", version, about)]
#[command(after_help = "\
例:
  collatz-viz step 7            7 の 1 ステップ (→ 22)
  collatz-viz run 27            27 から 1 までの軌道
  collatz-viz verify 1 100000   1〜100000 の全整数を検証
  collatz-viz                   対話モード")]
struct Cli {
    /// 設定ファイル (省略時は ./collatz.toml があれば読む)
    #[arg(long, global = true, env = "COLLATZ_CONFIG")]
    config: Option<PathBuf>,

    /// ログを詳しくする (-v: info, -vv: debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    /// output/ への保存をしない
    #[arg(long, global = true)]
    no_save: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// 1 ステップ計算
    Step { n: String },
    /// 軌道追跡 (1 に到達するまで)
    Run {
        seed: String,
        /// 画面に表示する先頭の値の数
        #[arg(long, default_value_t = 50)]
        show: usize,
    },
    /// 範囲検証 (並列)
    Verify { start: u64, end: u64 },
    /// 整数を繰り返し入力して履歴を表示
    Interactive,
}

struct Context {
    config: Config,
    save: bool,
}

impl Context {
    fn seed(&self, raw: &str) -> Result<Seed> {
        Seed::from_raw(&RawValue::from(raw), self.config.engine.coercion)
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("collatz_viz={}", level)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = match Config::load_or_default(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    let ctx = Context { save: config.output.save && !cli.no_save, config };

    let result = match cli.command.unwrap_or(Command::Interactive) {
        Command::Step { n } => cmd_step(&ctx, &n),
        Command::Run { seed, show } => cmd_run(&ctx, &seed, show),
        Command::Verify { start, end } => cmd_verify(&ctx, start, end),
        Command::Interactive => cmd_interactive(&ctx),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn cmd_step(ctx: &Context, raw: &str) -> Result<()> {
    let seed = ctx.seed(raw)?;
    let n = seed.value();

    let timer = Instant::now();
    let next = step(n)?;
    let elapsed = timer.elapsed();

    println!("n  = {}", format_big(n));
    println!("n' = {} ({})", format_big(&next), if next < *n { "n/2" } else { "3n+1" });
    println!("計算時間 = {:?}", elapsed);
    Ok(())
}

fn cmd_run(ctx: &Context, raw: &str, show: usize) -> Result<()> {
    let seed = ctx.seed(raw)?;
    let options = ctx.config.sequence_options();

    println!("Starting number: {}", format_big(seed.value()));
    println!();

    let timer = Instant::now();
    let mut last_print = Instant::now();
    let trajectory = run_sequence_with_callback(&seed, &options, |step, value| {
        let now = Instant::now();
        if now.duration_since(last_print).as_millis() >= 1000 {
            eprint!(
                "\r  [{:.1}s] step {} | {}桁",
                timer.elapsed().as_secs_f64(), step, value.to_string().len()
            );
            last_print = now;
        }
    })?;

    print_trajectory(&trajectory, show);
    print_stats(&trajectory);

    if ctx.save {
        match save_run(&ctx.config.output.dir, &trajectory) {
            Ok(saved) => {
                println!();
                println!("軌道CSV保存: {}", saved.csv.display());
                println!("サマリー保存: {}", saved.summary.display());
            }
            Err(e) => warn!(error = %e, "could not save run"),
        }
    }
    Ok(())
}

fn print_trajectory(trajectory: &Trajectory, show: usize) {
    let total = trajectory.values.len();
    println!("  {:>6}  {:>50}", "step", "value");
    for (i, (idx, value)) in trajectory.points().enumerate() {
        if i < show || i + 5 > total {
            println!("  {:>6}  {:>50}", idx, format_big(value));
        } else if i == show {
            println!("  ... ({} ステップ省略) ...", total.saturating_sub(show + 4));
        }
    }
}

fn print_stats(trajectory: &Trajectory) {
    let (peak_step, peak) = trajectory.peak();
    println!();
    println!("--- 統計 ---");
    println!("Steps (1始まり)    = {}", trajectory.reported_steps());
    println!("適用回数           = {}", trajectory.transformations());
    println!("最大値             = {} (step {})", format_big(peak), peak_step);
    println!("1に到達            = {}", if trajectory.reached_one() { "はい" } else { "いいえ" });
    println!("計算時間           = {:.3} us", trajectory.elapsed.as_secs_f64() * 1e6);
}

fn cmd_verify(ctx: &Context, start: u64, end: u64) -> Result<()> {
    let max_iterations = ctx.config.sequence_options().max_iterations;
    println!("範囲検証: [{}, {}] ({}スレッド並列)", start, end, rayon::current_num_threads());
    match max_iterations {
        Some(limit) => println!("(最大 {} ステップ/数)", limit),
        None => println!("(ステップ上限なし)"),
    }
    println!();

    let timer = Instant::now();
    let last_print = Mutex::new(Instant::now());
    let result = verify_range(start, end, max_iterations, |done, total| {
        let now = Instant::now();
        if let Ok(mut lp) = last_print.try_lock() {
            if now.duration_since(*lp).as_millis() >= 500 {
                let elapsed = timer.elapsed().as_secs_f64();
                eprint!(
                    "\r  [{:.1}s] {}/{} ({:.1}%) | {:.0} nums/s",
                    elapsed, done, total,
                    done as f64 / total as f64 * 100.0,
                    done as f64 / elapsed.max(1e-9)
                );
                *lp = now;
            }
        }
    });
    let elapsed = timer.elapsed();
    eprintln!();

    println!("--- 結果 ---");
    println!("検証した数      = {}", result.total_checked);
    println!("全て収束        = {}", if result.all_converged { "はい" } else { "いいえ" });
    println!("最長適用回数    = {} (n={})", result.max_transformations, result.max_transformations_seed);
    println!("計算時間        = {:?}", elapsed);
    if !result.failures.is_empty() {
        println!("上限内に収束しなかった数 = {} 個", result.failures.len());
        for f in result.failures.iter().take(10) {
            println!("  {}", f);
        }
    }
    info!(checked = result.total_checked, converged = result.all_converged, "verify finished");
    Ok(())
}

fn cmd_interactive(ctx: &Context) -> Result<()> {
    let mut session = InteractiveSession::new(ctx.config.engine.coercion, ctx.config.sequence_options());
    session.run(io::stdin().lock(), io::stdout().lock(), io::stderr())?;

    let history = session.into_history();
    if ctx.save && !history.is_empty() {
        match save_history(&ctx.config.output.dir, &history) {
            Ok(path) => println!("履歴保存: {}", path.display()),
            Err(e) => warn!(error = %e, "could not save history"),
        }
    }
    Ok(())
}

fn save_history(dir: &Path, history: &History) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(format!("history_{}.csv", timestamp()));
    history.write_csv(BufWriter::new(File::create(&path)?))?;
    Ok(path)
}
