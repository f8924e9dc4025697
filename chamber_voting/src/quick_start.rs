/*!

# Quick start

This example runs a three-candidate, one-seat election end to end.

**Collecting the ballots** Put one row per voter in a CSV file, the most
preferred candidate first. A spreadsheet export works as-is.

```text
id,choice 1,choice 2,choice 3
m-001,Alice,Bob,
m-002,Alice,,Charlie
m-003,Bob,Charlie,Alice
m-004,Charlie,Bob,
m-005,Alice,Bob,Charlie
```

**Describing the election** Write a minimal configuration file,
`election.json`, next to the ballots:

```text
{
    "outputSettings": { "contestName": "Quick start" },
    "ballotFileSources": [
        {
            "provider": "csv",
            "filePath": "ballots.csv",
            "firstVoteColumnIndex": 2,
            "firstVoteRowIndex": 2,
            "idColumnIndex": 1
        }
    ],
    "candidates": [
        { "name": "Alice" },
        { "name": "Bob" },
        { "name": "Charlie" }
    ],
    "rules": { "seatCount": 1 }
}
```

**Running the tabulation**

```bash
chambertally --config election.json
```

With these ballots, `Alice` holds 3 of the 5 valid votes and takes the
seat by majority in the first pass. The JSON summary printed at the end
lists the winner of each seat, the pass and the strategy that decided it,
and the tally of every counting round. Use the `--out` flag to write the
summary to a file, and `--reference` to compare the outcome against a
previously saved summary.

From the library, the same election is a few calls on the
[Builder](crate::builder::Builder):

```
use chamber_voting::builder::Builder;
use chamber_voting::ElectionRules;
# use chamber_voting::ElectionErrors;

let mut builder = Builder::new(&ElectionRules::DEFAULT_RULES)?
    .candidates(&["Alice".to_string(), "Bob".to_string(), "Charlie".to_string()])?;
builder.add_ballot("m-001", &["Alice".to_string(), "Bob".to_string()])?;
builder.add_ballot("m-003", &["Bob".to_string(), "Charlie".to_string()])?;
builder.add_ballot("m-005", &["Alice".to_string()])?;
let result = builder.run()?;
assert_eq!(result.winners[0].name, "Alice");
# Ok::<(), ElectionErrors>(())
```

*/
