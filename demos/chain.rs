use pledge::{Pledge, Resolution, Resolver, scheduler};

fn main() {
    let doubled = Pledge::<i32, String>::new(|resolver| {
        resolver.fulfill(21);
        Ok(())
    })
    .map(|x| x * 2);

    // A foreign thenable that fulfills synchronously.
    let adopted = Pledge::<i32, String>::adopt(Resolution::thenable(|r: Resolver<i32, String>| {
        r.fulfill(7);
        Ok(())
    }));

    let all = Pledge::all(vec![doubled, adopted]);
    all.map(|values| println!("All settled: {values:?}"))
        .catch(|reason| {
            println!("Failed: {reason}");
            Ok(())
        });

    let failing = Pledge::<i32, String>::resolved(1)
        .and_then(|_| Err::<i32, _>("boom".to_string()))
        .catch(|reason| {
            println!("Recovered from {reason}");
            Ok(0)
        });

    let ran = scheduler::run_until_idle();
    println!("Ran {ran} tasks, recovered value {:?}", failing.peek());
}
