// Sequences of integers such as `attesting_indices` and committee member lists.
// Items are handled by `string_or_native`.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    marker::PhantomData,
    str::FromStr,
};

use itertools::Itertools as _;
use serde::{
    de::{SeqAccess, Visitor},
    Deserialize, Deserializer, Serialize, Serializer,
};

#[derive(Deserialize, Serialize)]
#[serde(bound(
    deserialize = "T: Deserialize<'de> + FromStr<Err: Display>",
    serialize = "T: Serialize + Display",
))]
struct Item<T>(#[serde(with = "crate::string_or_native")] T);

pub fn deserialize<'de, I, C, D>(deserializer: D) -> Result<C, D::Error>
where
    I: Deserialize<'de> + FromStr<Err: Display>,
    C: FromIterator<I>,
    D: Deserializer<'de>,
{
    struct SequenceVisitor<I, C>(PhantomData<(I, C)>);

    impl<'de, I, C> Visitor<'de> for SequenceVisitor<I, C>
    where
        I: Deserialize<'de> + FromStr<Err: Display>,
        C: FromIterator<I>,
    {
        type Value = C;

        fn expecting(&self, formatter: &mut Formatter) -> FmtResult {
            formatter.write_str("a sequence of integers or strings containing them")
        }

        fn visit_seq<S: SeqAccess<'de>>(self, mut seq: S) -> Result<C, S::Error> {
            core::iter::from_fn(|| seq.next_element::<Item<I>>().transpose())
                .map_ok(|Item(item)| item)
                .collect()
        }
    }

    deserializer.deserialize_seq(SequenceVisitor(PhantomData))
}

pub fn serialize<S: Serializer>(
    items: impl IntoIterator<Item = impl Serialize + Display>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(items.into_iter().map(Item))
}
