use std::time::Duration;

use pledge::{Pledge, PledgeExt, scheduler};
use tokio::task::LocalSet;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    LocalSet::new()
        .run_until(async {
            scheduler::set_backend(|| {
                tokio::task::spawn_local(async {
                    scheduler::run_until_idle();
                });
            });

            let (slow, completion) = async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                Ok::<_, String>("slow")
            }
            .into_pledge();
            tokio::task::spawn_local(completion);

            let winner = Pledge::race(vec![slow, Pledge::resolved("fast")]);
            println!("Race settled with {:?}", winner.await);
        })
        .await;
}
