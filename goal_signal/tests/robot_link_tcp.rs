// Exercises RobotLink against real sockets on the loopback interface.

use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::{Duration, Instant};

use goal_signal::{
    ConnectionState, Decision, LinkTiming, ReceiverTiming, RobotLink, SignalReceiver, TcpConnector, TickOutcome,
    VoteCounts,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn closed_port() -> u16 {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    listener.local_addr().expect("local addr").port()
}

fn loopback(port: u16) -> TcpConnector {
    TcpConnector::new("127.0.0.1", port).expect("literal address resolves")
}

fn wait_for(deadline: Duration, mut done: impl FnMut() -> bool) {
    let until = Instant::now() + deadline;
    while !done() && Instant::now() < until {
        thread::sleep(ms(10));
    }
}

#[test]
fn robot_receives_every_decision() {
    let robot = SignalReceiver::bind(("127.0.0.1", 0), ReceiverTiming::default())
        .expect("bind")
        .start()
        .expect("start");
    robot.start_sampling_counts();

    let mut link = RobotLink::new(loopback(robot.local_addr().port()), LinkTiming::default());
    let t0 = Instant::now();
    let decisions = [
        Decision::new(false, false),
        Decision::new(false, true),
        Decision::new(true, false),
        Decision::new(true, true),
    ];
    for (i, decision) in decisions.into_iter().enumerate() {
        let now = t0 + ms(25 * i as u64);
        assert_eq!(link.tick(now, decision), TickOutcome::Sent(decision.to_byte()));
        // Throttled ticks in between must not put anything on the wire.
        assert_eq!(link.tick(now + ms(5), Decision::new(true, true)), TickOutcome::Throttled);
    }
    assert_eq!(link.state(), ConnectionState::Connected);

    wait_for(Duration::from_secs(5), || robot.counts().total == 4);
    // Sent 0b00, 0b01, 0b10, 0b11: each side was on twice.
    assert_eq!(
        robot.counts(),
        VoteCounts {
            left: 2,
            right: 2,
            total: 4
        }
    );
    assert_eq!(robot.latest(), Decision::new(true, true));
    assert!(robot.has_client_connection());

    link.disconnect();
    robot.stop();
}

#[test]
fn robot_sees_latest_decision_and_resets() {
    let robot = SignalReceiver::bind(("127.0.0.1", 0), ReceiverTiming::default())
        .expect("bind")
        .start()
        .expect("start");
    let mut link = RobotLink::new(loopback(robot.local_addr().port()), LinkTiming::default());

    let t0 = Instant::now();
    assert_eq!(link.tick(t0, Decision::new(true, false)), TickOutcome::Sent(2));
    wait_for(Duration::from_secs(5), || robot.latest() == Decision::new(true, false));
    assert_eq!(robot.latest(), Decision::new(true, false));
    // Not sampling, so nothing was counted.
    assert_eq!(robot.counts(), VoteCounts::default());

    robot.reset();
    let state = robot.snapshot();
    assert_eq!(state.latest(), Decision::default());
    assert!(state.last_heartbeat().is_some());

    link.disconnect();
    robot.stop();
}

#[test]
fn connector_falls_through_to_a_reachable_address() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    let live = listener.local_addr().expect("local addr");
    let dead = SocketAddr::from(([127, 0, 0, 1], closed_port()));
    let accepted = thread::spawn(move || listener.accept().map(|_| ()));

    let connector = TcpConnector::from_addrs("robot", vec![dead, live]);
    let mut link = RobotLink::new(connector, LinkTiming::default());
    assert_eq!(link.tick(Instant::now(), Decision::new(false, true)), TickOutcome::Sent(1));
    accepted.join().expect("accept thread").expect("accept");
}

#[test]
fn refused_connect_backs_off() {
    let port = closed_port();
    let mut link = RobotLink::new(loopback(port), LinkTiming::default());
    let t0 = Instant::now();

    assert_eq!(link.tick(t0, Decision::new(true, false)), TickOutcome::ConnectFailed);
    assert_eq!(link.state(), ConnectionState::Disconnected);
    assert_eq!(link.tick(t0 + ms(500), Decision::new(true, false)), TickOutcome::Throttled);
    assert_eq!(link.next_send_at(), Some(t0 + ms(1025)));
}

#[test]
fn connect_attempt_is_bounded_by_the_timeout() {
    // 10.255.255.1 is unroutable on most networks; either it times out or fails fast.
    let connector = TcpConnector::new("10.255.255.1", 1180)
        .expect("literal address resolves")
        .with_connect_timeout(ms(100));
    let mut link = RobotLink::new(connector, LinkTiming::default());

    let started = Instant::now();
    let outcome = link.tick(started, Decision::default());
    assert_ne!(outcome, TickOutcome::Throttled);
    assert!(started.elapsed() < Duration::from_secs(2), "connect took {:?}", started.elapsed());
}

#[test]
fn peer_going_away_drops_the_connection() {
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let robot = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        drop(stream);
        // Listener is dropped here too, so reconnects are refused.
    });

    let mut link = RobotLink::new(loopback(port), LinkTiming::default());
    let t0 = Instant::now();
    assert_eq!(link.tick(t0, Decision::new(false, true)), TickOutcome::Sent(1));
    robot.join().expect("robot thread");

    // The first write after the peer closes may still be accepted by the kernel;
    // one of the next few must fail.
    let mut now = t0;
    let mut failed = false;
    for _ in 0..20 {
        thread::sleep(ms(20));
        now += ms(25);
        match link.tick(now, Decision::new(false, true)) {
            TickOutcome::SendFailed => {
                failed = true;
                break;
            }
            TickOutcome::Sent(_) => continue,
            other => panic!("unexpected outcome {other:?}"),
        }
    }
    assert!(failed, "write to a closed peer never failed");
    assert_eq!(link.state(), ConnectionState::Disconnected);

    // Reconnecting to the gone robot is refused and backs off.
    assert_eq!(link.tick(now + ms(25), Decision::default()), TickOutcome::ConnectFailed);
}
