use super::*;

#[tokio::test]
async fn captures_stdout_for_successful_code() {
    let job = ExecuteJob::default();
    let outcome = job.run("print('hello from capped subprocess')").await.expect("run should succeed");

    assert!(outcome.success);
    assert_eq!(outcome.stdout.trim(), "hello from capped subprocess");
    assert!(outcome.stderr.is_empty());
}

#[tokio::test]
async fn captures_stderr_and_failure_on_raised_exception() {
    let job = ExecuteJob::default();
    let outcome = job.run("raise ValueError('boom')").await.expect("run should complete");

    assert!(!outcome.success);
    assert!(outcome.stderr.contains("ValueError"));
    assert!(outcome.stderr.contains("boom"));
}

#[tokio::test]
async fn cpu_limit_kills_a_busy_loop() {
    let job = ExecuteJob::default();
    let outcome = job.run("while True:\n    pass\n").await.expect("run should complete");

    assert!(!outcome.success);
}

#[tokio::test]
async fn unknown_interpreter_surfaces_a_spawn_error() {
    let job = ExecuteJob::new("xoblas-interpreter-that-does-not-exist");
    let err = job.run("print('unreachable')").await.unwrap_err();

    assert!(matches!(err, ExecuteError::Spawn(_)));
}
